use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mealplanner_core::Entity;
use mealplanner_core::mapper;
use mealplanner_core::models::{FoodItem, format_decimal};
use mealplanner_core::session::Session;

/// Parse a date, accepting today/tomorrow/next-monday as well as YYYY-MM-DD.
pub(crate) fn parse_date(date_str: Option<&str>) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    match date_str {
        None | Some("today") => Ok(today),
        Some("tomorrow") => Ok(today + chrono::Duration::days(1)),
        Some("next-monday") => {
            let ahead = 7 - i64::from(today.weekday().num_days_from_monday());
            Ok(today + chrono::Duration::days(ahead))
        }
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| {
            format!("Invalid date '{s}'. Use YYYY-MM-DD or today/tomorrow/next-monday")
        }),
    }
}

/// Select exactly one row matching `criteria`.
pub(crate) fn find_one<E: Entity>(session: &impl Session, criteria: &E, what: &str) -> Result<E> {
    let Some(found) = mapper::select(session, criteria)?.into_iter().next() else {
        bail!("No {} found for {what}", E::NAME);
    };
    Ok(found)
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_food_table(foods: &[&FoodItem]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "Group")]
        group: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Fat (mg)")]
        fat: String,
        #[tabled(rename = "Protein (mg)")]
        protein: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .map(|f| FoodRow {
            id: display_id(f.id),
            name: truncate(&f.formatted_name(), 35),
            unit: f.unit.clone().unwrap_or_default(),
            group: f.food_group.clone().unwrap_or_else(|| "-".into()),
            calories: display_amount(f.calories),
            fat: display_amount(f.fat),
            protein: display_amount(f.protein),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn display_id(id: Option<i64>) -> String {
    id.map_or_else(|| "-".into(), |id| id.to_string())
}

pub(crate) fn display_amount(amount: Option<f64>) -> String {
    amount.map_or_else(|| "-".into(), format_decimal)
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max.saturating_sub(3)).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealplanner_core::db::Database;

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
        assert_eq!(parse_date(Some("today")).unwrap(), today);
        assert_eq!(
            parse_date(Some("tomorrow")).unwrap(),
            today + chrono::Duration::days(1)
        );
        let monday = parse_date(Some("next-monday")).unwrap();
        assert_eq!(monday.weekday(), chrono::Weekday::Mon);
        assert!(monday > today);
        assert!(monday <= today + chrono::Duration::days(7));
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2025-03-10")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert!(parse_date(Some("nope")).is_err());
    }

    #[test]
    fn test_find_one() {
        let db = Database::open_in_memory().unwrap();
        db.setup().unwrap();
        let mut food = FoodItem {
            name: Some("Rice".to_string()),
            unit: Some("cup".to_string()),
            ..FoodItem::default()
        };
        mapper::insert(&db, &mut food).unwrap();

        let found = find_one(&db, &FoodItem::with_id(food.id.unwrap()), "id 1").unwrap();
        assert_eq!(found, food);
        let err = find_one(&db, &FoodItem::with_id(99), "id 99").unwrap_err();
        assert_eq!(err.to_string(), "No FoodItem found for id 99");
    }

    #[test]
    fn test_display_amount() {
        assert_eq!(display_amount(Some(2.50)), "2.5");
        assert_eq!(display_amount(None), "-");
        assert_eq!(display_id(Some(4)), "4");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
    }

    #[test]
    fn test_truncate_narrow_width() {
        assert_eq!(truncate("Porridge", 2), "...");
        assert_eq!(truncate("Porridge", 0), "...");
        assert_eq!(truncate("ab", 2), "ab");
    }
}
