use anyhow::{Result, bail};
use chrono::Duration;
use serde::Serialize;
use std::process;
use tabled::{Table, Tabled, settings::Style};

use mealplanner_core::db::Database;
use mealplanner_core::mapper;
use mealplanner_core::models::{Meal, MealPlan, Recipe};
use mealplanner_core::service::Planner;

use super::helpers::{display_id, find_one, parse_date, print_json};

fn load_plan(db: &Database, id: i64) -> Result<MealPlan> {
    let criteria = MealPlan {
        id: Some(id),
        ..MealPlan::default()
    };
    find_one(db, &criteria, &format!("id {id}"))
}

pub(crate) fn cmd_plan_create(
    db: &Database,
    name: &str,
    week_start: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut plan = MealPlan {
        name: Some(name.to_string()),
        week_start: Some(parse_date(week_start)?),
        ..MealPlan::default()
    };
    Planner::new(db).save_meal_plan(&mut plan, &mut [])?;

    if json {
        print_json(&plan)?;
    } else {
        let id = display_id(plan.id);
        let start = plan.week_start.map(|d| d.to_string()).unwrap_or_default();
        let end = plan.week_end().map(|d| d.to_string()).unwrap_or_default();
        println!("Created meal plan: {name} (id: {id}, {start} to {end})");
    }
    Ok(())
}

/// Schedule a recipe on a day of the plan's week, replacing whatever recipe
/// already fills that slot.
pub(crate) fn cmd_plan_add_meal(
    db: &Database,
    plan_id: i64,
    day: i64,
    meal_type: &str,
    recipe_id: i64,
    json: bool,
) -> Result<()> {
    let mut plan = load_plan(db, plan_id)?;
    let recipe = find_one(db, &Recipe::with_id(recipe_id), &format!("id {recipe_id}"))?;
    let mut meals = plan.meals(db)?.to_vec();

    let meal_type = meal_type.to_lowercase();
    match meals
        .iter_mut()
        .find(|m| m.day == Some(day) && m.meal_type.as_deref() == Some(meal_type.as_str()))
    {
        Some(existing) => existing.recipe_id = Some(recipe_id),
        None => meals.push(Meal {
            day: Some(day),
            meal_type: Some(meal_type.clone()),
            recipe_id: Some(recipe_id),
            ..Meal::default()
        }),
    }
    Planner::new(db).save_meal_plan(&mut plan, &mut meals)?;

    if json {
        print_json(&meals)?;
    } else {
        let name = recipe.name.as_deref().unwrap_or_default();
        println!("Planned {name} for {meal_type} on day {day}");
    }
    Ok(())
}

pub(crate) fn cmd_plan_remove_meal(db: &Database, meal_id: i64, json: bool) -> Result<()> {
    let criteria = Meal {
        id: Some(meal_id),
        ..Meal::default()
    };
    let Some(meal) = mapper::select(db, &criteria)?.into_iter().next() else {
        bail!("No meal found with id {meal_id}");
    };
    mapper::delete(db, &meal)?;
    if json {
        println!("{}", serde_json::json!({ "removed": meal_id }));
    } else {
        println!("Removed meal {meal_id}");
    }
    Ok(())
}

#[derive(Serialize)]
struct PlannedMeal<'a> {
    #[serde(flatten)]
    meal: &'a Meal,
    date: Option<chrono::NaiveDate>,
    recipe_name: Option<&'a str>,
}

pub(crate) fn cmd_plan_show(db: &Database, plan_id: i64, json: bool) -> Result<()> {
    let plan = load_plan(db, plan_id)?;
    let mut planned = Vec::new();
    for meal in plan.meals(db)? {
        let recipe = meal.recipe(db)?;
        let date = meal
            .day
            .zip(plan.week_start)
            .map(|(day, start)| start + Duration::days(day - 1));
        planned.push(PlannedMeal {
            meal,
            date,
            recipe_name: recipe.name.as_deref(),
        });
    }

    if json {
        return print_json(&serde_json::json!({ "plan": &plan, "meals": planned }));
    }

    let name = plan.name.as_deref().unwrap_or_default();
    let start = plan.week_start.map(|d| d.to_string()).unwrap_or_default();
    let end = plan.week_end().map(|d| d.to_string()).unwrap_or_default();
    println!("{name} ({start} to {end})");
    if planned.is_empty() {
        println!("No meals planned yet");
        return Ok(());
    }

    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Meal")]
        meal_type: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
    }

    let rows: Vec<MealRow> = planned
        .iter()
        .map(|p| MealRow {
            id: display_id(p.meal.id),
            date: p
                .date
                .map(|d| d.format("%a %Y-%m-%d").to_string())
                .unwrap_or_default(),
            meal_type: p.meal.meal_type.clone().unwrap_or_default(),
            recipe: p.recipe_name.unwrap_or_default().to_string(),
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_plan_list(db: &Database, json: bool) -> Result<()> {
    let plans = mapper::select(db, &MealPlan::default())?;

    if plans.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No meal plans found");
        }
        process::exit(2);
    }

    if json {
        return print_json(&plans);
    }

    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Week")]
        week: String,
    }

    let rows: Vec<PlanRow> = plans
        .iter()
        .map(|p| PlanRow {
            id: display_id(p.id),
            name: p.name.clone().unwrap_or_default(),
            week: match (p.week_start, p.week_end()) {
                (Some(start), Some(end)) => format!("{start} to {end}"),
                _ => String::new(),
            },
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_plan_delete(db: &Database, plan_id: i64, json: bool) -> Result<()> {
    let plan = load_plan(db, plan_id)?;
    mapper::delete(db, &plan)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": plan_id }));
    } else {
        let name = plan.name.as_deref().unwrap_or_default();
        println!("Deleted meal plan: {name} (id: {plan_id})");
    }
    Ok(())
}
