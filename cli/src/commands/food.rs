use anyhow::Result;
use std::process;
use tabled::{Table, Tabled, settings::Style};

use mealplanner_core::db::Database;
use mealplanner_core::mapper;
use mealplanner_core::models::FoodItem;
use mealplanner_core::service::Planner;

use super::helpers::{find_one, print_food_table, print_json};

/// Nutrition values as entered on the command line. Nutrients other than
/// calories are in milligrams.
#[derive(Debug, Clone, Default)]
pub(crate) struct Nutrition {
    pub calories: Option<f64>,
    pub fat: Option<f64>,
    pub cholesterol: Option<f64>,
    pub sodium: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub dietary_fiber: Option<f64>,
    pub sugars: Option<f64>,
    pub protein: Option<f64>,
}

impl Nutrition {
    /// Overwrite the nutrients that were given; leave the rest alone.
    fn apply(&self, food: &mut FoodItem) {
        let pairs = [
            (&mut food.calories, self.calories),
            (&mut food.fat, self.fat),
            (&mut food.cholesterol, self.cholesterol),
            (&mut food.sodium, self.sodium),
            (&mut food.carbohydrates, self.carbohydrates),
            (&mut food.dietary_fiber, self.dietary_fiber),
            (&mut food.sugars, self.sugars),
            (&mut food.protein, self.protein),
        ];
        for (slot, value) in pairs {
            if value.is_some() {
                *slot = value;
            }
        }
    }
}

pub(crate) fn cmd_food_add(
    db: &Database,
    name: &str,
    unit: &str,
    group: Option<String>,
    nutrition: &Nutrition,
    json: bool,
) -> Result<()> {
    let mut food = FoodItem {
        name: Some(name.to_string()),
        unit: Some(unit.to_string()),
        food_group: group,
        ..FoodItem::default()
    };
    nutrition.apply(&mut food);

    mapper::validate(&food)?;
    mapper::insert(db, &mut food)?;

    if json {
        print_json(&food)?;
    } else {
        let id = food.id.unwrap_or_default();
        println!("Added food: {food} (id: {id})");
    }
    Ok(())
}

pub(crate) fn cmd_food_update(
    db: &Database,
    id: i64,
    name: Option<String>,
    unit: Option<String>,
    group: Option<String>,
    nutrition: &Nutrition,
    json: bool,
) -> Result<()> {
    let mut food = find_one(db, &FoodItem::with_id(id), &format!("id {id}"))?;
    if name.is_some() {
        food.name = name;
    }
    if unit.is_some() {
        food.unit = unit;
    }
    if group.is_some() {
        food.food_group = group;
    }
    nutrition.apply(&mut food);

    mapper::validate(&food)?;
    mapper::update(db, &food)?;

    if json {
        print_json(&food)?;
    } else {
        println!("Updated food: {food} (id: {id})");
    }
    Ok(())
}

pub(crate) fn cmd_food_list(db: &Database, search: Option<&str>, json: bool) -> Result<()> {
    let foods = Planner::new(db).food_search(search.unwrap_or_default())?;

    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No foods found");
        }
        process::exit(2);
    }

    if json {
        print_json(&foods)?;
    } else {
        let refs: Vec<&FoodItem> = foods.iter().collect();
        print_food_table(&refs);
    }
    Ok(())
}

pub(crate) fn cmd_food_show(db: &Database, id: i64, quantity: Option<f64>, json: bool) -> Result<()> {
    let food = find_one(db, &FoodItem::with_id(id), &format!("id {id}"))?;
    let details = food.nutrition_details(quantity);

    if json {
        let details: serde_json::Map<String, serde_json::Value> = details
            .into_iter()
            .map(|(label, value)| (label.to_string(), value.into()))
            .collect();
        print_json(&serde_json::json!({ "food": food, "details": details }))?;
        return Ok(());
    }

    match quantity {
        Some(q) => println!("{}", food.formatted_quantity(q)),
        None => println!("{food}"),
    }
    if details.is_empty() {
        println!("No nutrition information");
    } else {
        #[derive(Tabled)]
        struct DetailRow {
            #[tabled(rename = "Nutrient")]
            label: &'static str,
            #[tabled(rename = "Amount")]
            value: String,
        }
        let rows: Vec<DetailRow> = details
            .into_iter()
            .map(|(label, value)| DetailRow { label, value })
            .collect();
        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn cmd_food_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    let food = find_one(db, &FoodItem::with_id(id), &format!("id {id}"))?;
    mapper::delete(db, &food)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted food: {food} (id: {id})");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nutrition_apply_keeps_unset_values() {
        let mut food = FoodItem {
            calories: Some(100.0),
            fat: Some(5.0),
            ..FoodItem::default()
        };
        let nutrition = Nutrition {
            fat: Some(7.0),
            sodium: Some(40.0),
            ..Nutrition::default()
        };
        nutrition.apply(&mut food);
        assert_eq!(food.calories, Some(100.0));
        assert_eq!(food.fat, Some(7.0));
        assert_eq!(food.sodium, Some(40.0));
        assert_eq!(food.protein, None);
    }

    #[test]
    fn test_add_rejects_unknown_group() {
        let db = Database::open_in_memory().unwrap();
        db.setup().unwrap();
        let err = cmd_food_add(
            &db,
            "Gummy Bears",
            "bag",
            Some("candy".to_string()),
            &Nutrition::default(),
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("field 'food_group'"));
        assert!(mapper::select(&db, &FoodItem::default()).unwrap().is_empty());
    }

    #[test]
    fn test_add_update_delete() {
        let db = Database::open_in_memory().unwrap();
        db.setup().unwrap();
        cmd_food_add(&db, "White Sandwich Bread", "slice", None, &Nutrition::default(), true)
            .unwrap();
        let nutrition = Nutrition {
            calories: Some(80.0),
            ..Nutrition::default()
        };
        cmd_food_update(&db, 1, None, None, Some("grains".to_string()), &nutrition, true).unwrap();

        let food = find_one(&db, &FoodItem::with_id(1), "id 1").unwrap();
        assert_eq!(food.food_group.as_deref(), Some("grains"));
        assert_eq!(food.calories, Some(80.0));

        cmd_food_delete(&db, 1, true).unwrap();
        assert!(cmd_food_delete(&db, 1, true).is_err());
    }
}
