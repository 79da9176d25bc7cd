use anyhow::Result;
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplanner_core::db::Database;
use mealplanner_core::models::FoodItem;
use mealplanner_core::service::Planner;

use super::helpers::{display_amount, print_json};

#[derive(Serialize)]
struct ShoppingEntry<'a> {
    food: &'a FoodItem,
    quantity: Option<f64>,
    description: String,
}

pub(crate) fn cmd_shopping(db: &Database, json: bool) -> Result<()> {
    let items = Planner::new(db).shopping_list()?;

    if items.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("Nothing to buy: the fridge covers every planned meal");
        }
        process::exit(2);
    }

    let mut entries = Vec::with_capacity(items.len());
    for item in &items {
        let food = item.food_item(db)?;
        entries.push(ShoppingEntry {
            food,
            quantity: item.quantity,
            description: food.formatted_quantity(item.quantity.unwrap_or_default()),
        });
    }

    if json {
        return print_json(&entries);
    }

    #[derive(Tabled)]
    struct ShoppingRow {
        #[tabled(rename = "Food")]
        food: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
    }

    let rows: Vec<ShoppingRow> = entries
        .iter()
        .map(|e| ShoppingRow {
            food: e.food.formatted_name(),
            unit: e.food.formatted_unit(),
            quantity: display_amount(e.quantity),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
