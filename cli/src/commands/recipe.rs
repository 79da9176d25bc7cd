use anyhow::{Result, bail};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplanner_core::db::Database;
use mealplanner_core::mapper;
use mealplanner_core::models::{FoodItem, Recipe, RecipeIngredient, RecipeInstruction};
use mealplanner_core::service::Planner;
use mealplanner_core::session::Session;

use super::helpers::{display_id, find_one, print_json, truncate};

fn load_recipe(db: &Database, id: i64) -> Result<Recipe> {
    find_one(db, &Recipe::with_id(id), &format!("id {id}"))
}

/// The stored children of a recipe, as editable lists.
fn children(
    db: &impl Session,
    recipe: &Recipe,
) -> Result<(Vec<RecipeIngredient>, Vec<RecipeInstruction>)> {
    Ok((
        recipe.ingredients(db)?.to_vec(),
        recipe.instructions(db)?.to_vec(),
    ))
}

pub(crate) fn cmd_recipe_create(
    db: &Database,
    name: &str,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let mut recipe = Recipe {
        name: Some(name.to_string()),
        category,
        ..Recipe::default()
    };
    Planner::new(db).save_recipe(&mut recipe, &mut [], &mut [])?;

    if json {
        print_json(&recipe)?;
    } else {
        let id = display_id(recipe.id);
        println!("Created recipe: {name} (id: {id})");
        println!(
            "Add ingredients with: mealplanner recipe add-ingredient {id} <food-id> <quantity>"
        );
    }
    Ok(())
}

/// Add a food to a recipe, or change its quantity when already present.
pub(crate) fn cmd_recipe_add_ingredient(
    db: &Database,
    recipe_id: i64,
    food_id: i64,
    quantity: f64,
    json: bool,
) -> Result<()> {
    let mut recipe = load_recipe(db, recipe_id)?;
    let food = find_one(db, &FoodItem::with_id(food_id), &format!("id {food_id}"))?;
    let (mut ingredients, mut instructions) = children(db, &recipe)?;

    match ingredients.iter_mut().find(|i| i.food_id == Some(food_id)) {
        Some(existing) => existing.quantity = Some(quantity),
        None => ingredients.push(RecipeIngredient {
            food_id: Some(food_id),
            quantity: Some(quantity),
            ..RecipeIngredient::default()
        }),
    }
    Planner::new(db).save_recipe(&mut recipe, &mut ingredients, &mut instructions)?;

    if json {
        print_json(&ingredients)?;
    } else {
        let name = recipe.name.as_deref().unwrap_or_default();
        println!("Added {} to {name}", food.formatted_quantity(quantity));
    }
    Ok(())
}

pub(crate) fn cmd_recipe_remove_ingredient(
    db: &Database,
    recipe_id: i64,
    food_id: i64,
    json: bool,
) -> Result<()> {
    let mut recipe = load_recipe(db, recipe_id)?;
    let (mut ingredients, mut instructions) = children(db, &recipe)?;
    let before = ingredients.len();
    ingredients.retain(|i| i.food_id != Some(food_id));
    if ingredients.len() == before {
        bail!("Food {food_id} is not an ingredient of recipe {recipe_id}");
    }
    Planner::new(db).save_recipe(&mut recipe, &mut ingredients, &mut instructions)?;

    if json {
        println!("{}", serde_json::json!({ "removed": food_id }));
    } else {
        println!("Removed food {food_id} from recipe {recipe_id}");
    }
    Ok(())
}

/// Append an instruction, or insert it at `step` and renumber the rest.
pub(crate) fn cmd_recipe_add_step(
    db: &Database,
    recipe_id: i64,
    text: &str,
    step: Option<i64>,
    json: bool,
) -> Result<()> {
    let mut recipe = load_recipe(db, recipe_id)?;
    let (mut ingredients, mut instructions) = children(db, &recipe)?;

    let last = instructions.iter().filter_map(|i| i.step).max().unwrap_or(0);
    let step = step.unwrap_or(last + 1);
    let added = RecipeInstruction {
        recipe_id: recipe.id,
        step: Some(step),
        instruction: Some(text.to_string()),
        ..RecipeInstruction::default()
    };
    mapper::validate(&added)?;

    for instruction in &mut instructions {
        if let Some(n) = instruction.step.filter(|n| *n >= step) {
            instruction.step = Some(n + 1);
        }
    }
    instructions.push(added);
    Planner::new(db).save_recipe(&mut recipe, &mut ingredients, &mut instructions)?;

    if json {
        print_json(&instructions)?;
    } else {
        println!("Added step {step} to recipe {recipe_id}");
    }
    Ok(())
}

#[derive(Serialize)]
struct RecipeDetail<'a> {
    recipe: &'a Recipe,
    ingredients: Vec<IngredientDetail<'a>>,
    instructions: &'a [RecipeInstruction],
}

#[derive(Serialize)]
struct IngredientDetail<'a> {
    food: &'a FoodItem,
    quantity: Option<f64>,
    description: String,
}

pub(crate) fn cmd_recipe_show(db: &Database, recipe_id: i64, json: bool) -> Result<()> {
    let recipe = load_recipe(db, recipe_id)?;
    let mut ingredients = Vec::new();
    for ingredient in recipe.ingredients(db)? {
        let food = ingredient.food_item(db)?;
        let quantity = ingredient.quantity.unwrap_or_default();
        ingredients.push(IngredientDetail {
            food,
            quantity: ingredient.quantity,
            description: food.formatted_quantity(quantity),
        });
    }
    let detail = RecipeDetail {
        recipe: &recipe,
        ingredients,
        instructions: recipe.instructions(db)?,
    };

    if json {
        return print_json(&detail);
    }

    let name = recipe.name.as_deref().unwrap_or_default();
    match &recipe.category {
        Some(category) => println!("{name} ({category})"),
        None => println!("{name}"),
    }
    println!();
    if detail.ingredients.is_empty() {
        println!("No ingredients yet");
    } else {
        println!("Ingredients:");
        for ingredient in &detail.ingredients {
            println!("  - {}", ingredient.description);
        }
    }
    if !detail.instructions.is_empty() {
        println!();
        println!("Instructions:");
        for instruction in detail.instructions {
            let step = display_id(instruction.step);
            let text = instruction.instruction.as_deref().unwrap_or_default();
            println!("  {step}. {text}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(db: &Database, json: bool) -> Result<()> {
    let recipes = mapper::select(db, &Recipe::default())?;

    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        process::exit(2);
    }

    if json {
        return print_json(&recipes);
    }

    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
    }

    let mut rows = Vec::with_capacity(recipes.len());
    for recipe in &recipes {
        rows.push(RecipeRow {
            id: display_id(recipe.id),
            name: truncate(recipe.name.as_deref().unwrap_or_default(), 35),
            category: recipe.category.clone().unwrap_or_else(|| "-".into()),
            ingredients: recipe.ingredients(db)?.len(),
        });
    }
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

/// Delete a recipe; its ingredients, instructions and planned meals go with it.
pub(crate) fn cmd_recipe_delete(db: &Database, recipe_id: i64, json: bool) -> Result<()> {
    let recipe = load_recipe(db, recipe_id)?;
    mapper::delete(db, &recipe)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": recipe_id }));
    } else {
        let name = recipe.name.as_deref().unwrap_or_default();
        println!("Deleted recipe: {name} (id: {recipe_id})");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.setup().unwrap();
        for (name, unit) in [("Egg", "each"), ("Milk", "cup")] {
            let mut food = FoodItem {
                name: Some(name.to_string()),
                unit: Some(unit.to_string()),
                ..FoodItem::default()
            };
            mapper::insert(&db, &mut food).unwrap();
        }
        db
    }

    #[test]
    fn test_ingredients_are_added_and_replaced() {
        let db = setup_db();
        cmd_recipe_create(&db, "Omelette", None, true).unwrap();
        cmd_recipe_add_ingredient(&db, 1, 1, 3.0, true).unwrap();
        cmd_recipe_add_ingredient(&db, 1, 2, 0.5, true).unwrap();
        cmd_recipe_add_ingredient(&db, 1, 1, 2.0, true).unwrap();

        let recipe = load_recipe(&db, 1).unwrap();
        let quantities: Vec<_> = recipe
            .ingredients(&db)
            .unwrap()
            .iter()
            .map(|i| (i.food_id.unwrap(), i.quantity.unwrap()))
            .collect();
        assert_eq!(quantities, vec![(1, 2.0), (2, 0.5)]);

        cmd_recipe_remove_ingredient(&db, 1, 2, true).unwrap();
        assert!(cmd_recipe_remove_ingredient(&db, 1, 2, true).is_err());
        let recipe = load_recipe(&db, 1).unwrap();
        assert_eq!(recipe.ingredients(&db).unwrap().len(), 1);
    }

    #[test]
    fn test_steps_are_renumbered_on_insert() {
        let db = setup_db();
        cmd_recipe_create(&db, "Omelette", Some("breakfast".to_string()), true).unwrap();
        cmd_recipe_add_step(&db, 1, "Whisk", None, true).unwrap();
        cmd_recipe_add_step(&db, 1, "Fry", None, true).unwrap();
        cmd_recipe_add_step(&db, 1, "Crack eggs", Some(1), true).unwrap();

        let recipe = load_recipe(&db, 1).unwrap();
        let steps: Vec<_> = recipe
            .instructions(&db)
            .unwrap()
            .iter()
            .map(|i| (i.step.unwrap(), i.instruction.clone().unwrap()))
            .collect();
        assert_eq!(
            steps,
            vec![
                (1, "Crack eggs".to_string()),
                (2, "Whisk".to_string()),
                (3, "Fry".to_string())
            ]
        );
    }

    #[test]
    fn test_rejected_step_leaves_stored_steps_alone() {
        let db = setup_db();
        cmd_recipe_create(&db, "Omelette", None, true).unwrap();
        cmd_recipe_add_step(&db, 1, "Whisk", None, true).unwrap();
        cmd_recipe_add_step(&db, 1, "Fry", None, true).unwrap();

        for step in [0, -2] {
            let err = cmd_recipe_add_step(&db, 1, "Serve", Some(step), true).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Invalid RecipeInstruction: value for field 'step' must be greater than 0"
            );
        }
        let err = cmd_recipe_add_step(&db, 1, " ", Some(1), true).unwrap_err();
        assert!(err.to_string().contains("field 'instruction'"));

        let recipe = load_recipe(&db, 1).unwrap();
        let steps: Vec<_> = recipe
            .instructions(&db)
            .unwrap()
            .iter()
            .map(|i| (i.step.unwrap(), i.instruction.clone().unwrap()))
            .collect();
        assert_eq!(
            steps,
            vec![(1, "Whisk".to_string()), (2, "Fry".to_string())]
        );
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let db = setup_db();
        let err = cmd_recipe_create(&db, "  ", None, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Recipe: value for field 'name' is required"
        );
    }

    #[test]
    fn test_delete_cascades_to_children() {
        let db = setup_db();
        cmd_recipe_create(&db, "Omelette", None, true).unwrap();
        cmd_recipe_add_ingredient(&db, 1, 1, 3.0, true).unwrap();
        cmd_recipe_add_step(&db, 1, "Whisk", None, true).unwrap();
        cmd_recipe_delete(&db, 1, true).unwrap();
        assert!(
            mapper::select(&db, &RecipeIngredient::default())
                .unwrap()
                .is_empty()
        );
        assert!(
            mapper::select(&db, &RecipeInstruction::default())
                .unwrap()
                .is_empty()
        );
    }
}
