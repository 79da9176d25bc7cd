use anyhow::{Result, bail};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplanner_core::db::Database;
use mealplanner_core::mapper;
use mealplanner_core::models::{FoodItem, FridgeItem};
use mealplanner_core::service::Planner;

use super::helpers::{display_id, find_one, print_json};

pub(crate) fn cmd_fridge_add(db: &Database, food_id: i64, quantity: f64, json: bool) -> Result<()> {
    let food = find_one(db, &FoodItem::with_id(food_id), &format!("id {food_id}"))?;
    let mut item = FridgeItem {
        food_id: Some(food_id),
        quantity: Some(quantity),
        ..FridgeItem::default()
    };
    mapper::validate(&item)?;
    mapper::insert(db, &mut item)?;

    if json {
        print_json(&item)?;
    } else {
        let id = display_id(item.id);
        println!("Stocked {} (id: {id})", food.formatted_quantity(quantity));
    }
    Ok(())
}

pub(crate) fn cmd_fridge_list(db: &Database, json: bool) -> Result<()> {
    let items = Planner::new(db).fridge_contents()?;

    if items.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("The fridge is empty");
        }
        process::exit(2);
    }

    if json {
        print_json(&items)?;
        return Ok(());
    }

    #[derive(Tabled)]
    struct FridgeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Food")]
        food: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
    }

    let mut rows = Vec::with_capacity(items.len());
    for item in &items {
        let food = item.food_item(db)?;
        rows.push(FridgeRow {
            id: display_id(item.id),
            food: food.formatted_name(),
            quantity: food.formatted_quantity(item.quantity.unwrap_or_default()),
        });
    }
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

/// Change the stocked quantity, removing the item when it drops to zero.
pub(crate) fn cmd_fridge_set(db: &Database, id: i64, quantity: f64, json: bool) -> Result<()> {
    if quantity < 0.0 {
        bail!("Quantity cannot be negative");
    }
    let criteria = FridgeItem {
        id: Some(id),
        ..FridgeItem::default()
    };
    let mut item = find_one(db, &criteria, &format!("id {id}"))?;

    if quantity == 0.0 {
        mapper::delete(db, &item)?;
        if json {
            println!("{}", serde_json::json!({ "removed": id }));
        } else {
            println!("Removed fridge item {id}");
        }
        return Ok(());
    }

    item.quantity = Some(quantity);
    mapper::validate(&item)?;
    mapper::update(db, &item)?;
    if json {
        print_json(&item)?;
    } else {
        let food = item.food_item(db)?;
        println!("Now stocking {}", food.formatted_quantity(quantity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.setup().unwrap();
        let mut milk = FoodItem {
            name: Some("Milk".to_string()),
            unit: Some("cup".to_string()),
            ..FoodItem::default()
        };
        mapper::insert(&db, &mut milk).unwrap();
        db
    }

    #[test]
    fn test_add_requires_known_food() {
        let db = setup_db();
        assert!(cmd_fridge_add(&db, 42, 1.0, true).is_err());
        let err = cmd_fridge_add(&db, 1, 0.0, true).unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
        cmd_fridge_add(&db, 1, 2.0, true).unwrap();
        assert_eq!(mapper::select(&db, &FridgeItem::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_set_to_zero_removes_item() {
        let db = setup_db();
        cmd_fridge_add(&db, 1, 2.0, true).unwrap();
        cmd_fridge_set(&db, 1, 3.5, true).unwrap();
        let items = mapper::select(&db, &FridgeItem::default()).unwrap();
        assert_eq!(items[0].quantity, Some(3.5));

        cmd_fridge_set(&db, 1, 0.0, true).unwrap();
        assert!(mapper::select(&db, &FridgeItem::default()).unwrap().is_empty());
        assert!(cmd_fridge_set(&db, 1, -1.0, true).is_err());
    }
}
