use std::fmt;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::error::Result;
use crate::field;
use crate::relation::{Related, load_many, load_one};
use crate::schema::{Constraint, Entity, Field, SortOrder};
use crate::session::Session;

pub const FOOD_GROUPS: &[&str] = &["fruit", "vegetable", "grains", "protein", "dairy"];
pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner"];

const REQUIRED: &[Constraint] = &[Constraint::Required];
const NON_NEGATIVE: &[Constraint] = &[Constraint::AtLeast(0.0)];
const POSITIVE_REQUIRED: &[Constraint] = &[Constraint::Required, Constraint::Above(0.0)];

fn describe_key(id: Option<i64>) -> String {
    id.map_or_else(|| "none".to_string(), |id| id.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FoodItem {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub food_group: Option<String>,
    pub unit: Option<String>,
    pub calories: Option<f64>,
    /// Milligrams, as are the remaining nutrients.
    pub fat: Option<f64>,
    pub cholesterol: Option<f64>,
    pub sodium: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub dietary_fiber: Option<f64>,
    pub sugars: Option<f64>,
    pub protein: Option<f64>,
}

impl Entity for FoodItem {
    const NAME: &'static str = "FoodItem";
    const TABLE: &'static str = "food_item";
    const FIELDS: &'static [Field<Self>] = &[
        field!(FoodItem, id, Integer).primary_key(),
        field!(FoodItem, name, Text)
            .check(REQUIRED)
            .order(SortOrder::Asc),
        field!(FoodItem, food_group, Text).check(&[Constraint::OneOf(FOOD_GROUPS)]),
        field!(FoodItem, unit, Text)
            .check(REQUIRED)
            .order(SortOrder::Asc),
        field!(FoodItem, calories, Decimal).check(NON_NEGATIVE),
        field!(FoodItem, fat, Decimal).check(NON_NEGATIVE),
        field!(FoodItem, cholesterol, Decimal).check(NON_NEGATIVE),
        field!(FoodItem, sodium, Decimal).check(NON_NEGATIVE),
        field!(FoodItem, carbohydrates, Decimal).check(NON_NEGATIVE),
        field!(FoodItem, dietary_fiber, Decimal).check(NON_NEGATIVE),
        field!(FoodItem, sugars, Decimal).check(NON_NEGATIVE),
        field!(FoodItem, protein, Decimal).check(NON_NEGATIVE),
    ];
}

/// Render a number without trailing zeros: `2.50` is `2.5`, `3.0` is `3`.
#[must_use]
pub fn format_decimal(value: f64) -> String {
    format!("{value}")
}

/// Render a milligram amount, switching to grams from 1000 mg upward.
#[must_use]
pub fn format_milligrams(milligrams: f64) -> String {
    let (amount, singular, plural) = if milligrams >= 1000.0 {
        (milligrams / 1000.0, "gram", "grams")
    } else {
        (milligrams, "milligram", "milligrams")
    };
    let formatted = format_decimal(amount);
    let unit = if formatted == "1" { singular } else { plural };
    format!("{formatted} {unit}")
}

fn capitalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl FoodItem {
    #[must_use]
    pub fn with_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn formatted_name(&self) -> String {
        capitalize(self.name.as_deref().unwrap_or_default())
    }

    #[must_use]
    pub fn formatted_unit(&self) -> String {
        capitalize(self.unit.as_deref().unwrap_or_default())
    }

    /// e.g. `2 slice(s) of White Sandwich Bread`
    #[must_use]
    pub fn formatted_quantity(&self, quantity: f64) -> String {
        format!(
            "{} {}(s) of {}",
            format_decimal(quantity),
            self.unit.as_deref().unwrap_or_default().to_lowercase(),
            self.formatted_name()
        )
    }

    /// Label/value pairs for every known nutrient, scaled by `quantity`
    /// units (one unit when absent).
    #[must_use]
    pub fn nutrition_details(&self, quantity: Option<f64>) -> Vec<(&'static str, String)> {
        let quantity = quantity.unwrap_or(1.0);
        let mut details = Vec::new();
        if let Some(group) = &self.food_group {
            details.push(("Food Group", group.clone()));
        }
        if let Some(calories) = self.calories {
            details.push(("Calories", format_decimal(calories * quantity)));
        }
        let nutrients = [
            ("Fat", self.fat),
            ("Cholesterol", self.cholesterol),
            ("Sodium", self.sodium),
            ("Carbohydrates", self.carbohydrates),
            ("Dietary Fiber", self.dietary_fiber),
            ("Sugars", self.sugars),
            ("Protein", self.protein),
        ];
        for (label, amount) in nutrients {
            if let Some(amount) = amount {
                details.push((label, format_milligrams(amount * quantity)));
            }
        }
        details
    }
}

impl fmt::Display for FoodItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.formatted_unit(), self.formatted_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FridgeItem {
    pub id: Option<i64>,
    pub food_id: Option<i64>,
    pub quantity: Option<f64>,
    #[serde(skip)]
    pub food: Related<FoodItem>,
}

impl Entity for FridgeItem {
    const NAME: &'static str = "FridgeItem";
    const TABLE: &'static str = "fridge_item";
    const FIELDS: &'static [Field<Self>] = &[
        field!(FridgeItem, id, Integer).primary_key(),
        field!(FridgeItem, food_id, Integer)
            .check(REQUIRED)
            .order(SortOrder::Asc),
        field!(FridgeItem, quantity, Decimal)
            .check(POSITIVE_REQUIRED)
            .order(SortOrder::Desc),
    ];
}

impl FridgeItem {
    pub fn food_item(&self, session: &impl Session) -> Result<&FoodItem> {
        self.food.get_or_try_load(|| {
            load_one(
                session,
                self.food_id.map(FoodItem::with_id),
                Self::NAME,
                describe_key(self.food_id),
            )
        })
    }

    pub fn clear_cache(&mut self) {
        self.food.invalidate();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MealPlan {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub week_start: Option<NaiveDate>,
    #[serde(skip)]
    pub meals: Related<Vec<Meal>>,
}

impl Entity for MealPlan {
    const NAME: &'static str = "MealPlan";
    const TABLE: &'static str = "meal_plan";
    const FIELDS: &'static [Field<Self>] = &[
        field!(MealPlan, id, Integer).primary_key(),
        field!(MealPlan, name, Text).check(REQUIRED),
        field!(MealPlan, week_start, Date)
            .check(REQUIRED)
            .order(SortOrder::Asc),
    ];
}

impl MealPlan {
    /// Last day of the planned week.
    #[must_use]
    pub fn week_end(&self) -> Option<NaiveDate> {
        self.week_start?.checked_add_days(Days::new(6))
    }

    pub fn meals(&self, session: &impl Session) -> Result<&[Meal]> {
        self.meals
            .get_or_try_load(|| {
                let criteria = self.id.map(|plan_id| Meal {
                    plan_id: Some(plan_id),
                    ..Meal::default()
                });
                load_many(session, criteria)
            })
            .map(Vec::as_slice)
    }

    pub fn clear_cache(&mut self) {
        self.meals.invalidate();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Meal {
    pub id: Option<i64>,
    pub plan_id: Option<i64>,
    /// 1 (first day of the plan's week) through 7.
    pub day: Option<i64>,
    #[serde(rename = "type")]
    pub meal_type: Option<String>,
    pub recipe_id: Option<i64>,
    #[serde(skip)]
    pub recipe: Related<Recipe>,
}

impl Entity for Meal {
    const NAME: &'static str = "Meal";
    const TABLE: &'static str = "meal";
    const FIELDS: &'static [Field<Self>] = &[
        field!(Meal, id, Integer).primary_key(),
        field!(Meal, plan_id, Integer).check(REQUIRED),
        field!(Meal, day, Integer)
            .check(&[Constraint::Required, Constraint::Range { min: 1.0, max: 7.0 }])
            .order(SortOrder::Asc),
        field!(Meal, meal_type, "type", Text)
            .check(&[Constraint::Required, Constraint::OneOf(MEAL_TYPES)]),
        field!(Meal, recipe_id, Integer).check(REQUIRED),
    ];
}

impl Meal {
    pub fn recipe(&self, session: &impl Session) -> Result<&Recipe> {
        self.recipe.get_or_try_load(|| {
            load_one(
                session,
                self.recipe_id.map(Recipe::with_id),
                Self::NAME,
                describe_key(self.recipe_id),
            )
        })
    }

    pub fn clear_cache(&mut self) {
        self.recipe.invalidate();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recipe {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(skip)]
    pub ingredients: Related<Vec<RecipeIngredient>>,
    #[serde(skip)]
    pub instructions: Related<Vec<RecipeInstruction>>,
}

impl Entity for Recipe {
    const NAME: &'static str = "Recipe";
    const TABLE: &'static str = "recipe";
    const FIELDS: &'static [Field<Self>] = &[
        field!(Recipe, id, Integer).primary_key(),
        field!(Recipe, name, Text)
            .check(REQUIRED)
            .order(SortOrder::Asc),
        field!(Recipe, category, Text),
    ];
}

impl Recipe {
    #[must_use]
    pub fn with_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn ingredients(&self, session: &impl Session) -> Result<&[RecipeIngredient]> {
        self.ingredients
            .get_or_try_load(|| {
                let criteria = self.id.map(|recipe_id| RecipeIngredient {
                    recipe_id: Some(recipe_id),
                    ..RecipeIngredient::default()
                });
                load_many(session, criteria)
            })
            .map(Vec::as_slice)
    }

    /// Steps in ascending order.
    pub fn instructions(&self, session: &impl Session) -> Result<&[RecipeInstruction]> {
        self.instructions
            .get_or_try_load(|| {
                let criteria = self.id.map(|recipe_id| RecipeInstruction {
                    recipe_id: Some(recipe_id),
                    ..RecipeInstruction::default()
                });
                load_many(session, criteria)
            })
            .map(Vec::as_slice)
    }

    pub fn clear_cache(&mut self) {
        self.ingredients.invalidate();
        self.instructions.invalidate();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecipeIngredient {
    pub recipe_id: Option<i64>,
    pub food_id: Option<i64>,
    pub quantity: Option<f64>,
    #[serde(skip)]
    pub food: Related<FoodItem>,
}

impl Entity for RecipeIngredient {
    const NAME: &'static str = "RecipeIngredient";
    const TABLE: &'static str = "recipe_ingredient";
    const FIELDS: &'static [Field<Self>] = &[
        field!(RecipeIngredient, recipe_id, Integer)
            .primary_key()
            .check(REQUIRED),
        field!(RecipeIngredient, food_id, Integer)
            .primary_key()
            .check(REQUIRED)
            .order(SortOrder::Asc),
        field!(RecipeIngredient, quantity, Decimal)
            .check(POSITIVE_REQUIRED)
            .order(SortOrder::Desc),
    ];
}

impl RecipeIngredient {
    pub fn food_item(&self, session: &impl Session) -> Result<&FoodItem> {
        self.food.get_or_try_load(|| {
            load_one(
                session,
                self.food_id.map(FoodItem::with_id),
                Self::NAME,
                describe_key(self.food_id),
            )
        })
    }

    pub fn clear_cache(&mut self) {
        self.food.invalidate();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecipeInstruction {
    pub id: Option<i64>,
    pub recipe_id: Option<i64>,
    pub step: Option<i64>,
    pub instruction: Option<String>,
}

impl Entity for RecipeInstruction {
    const NAME: &'static str = "RecipeInstruction";
    const TABLE: &'static str = "recipe_instruction";
    const FIELDS: &'static [Field<Self>] = &[
        field!(RecipeInstruction, id, Integer).primary_key(),
        field!(RecipeInstruction, recipe_id, Integer).check(REQUIRED),
        field!(RecipeInstruction, step, Integer)
            .check(POSITIVE_REQUIRED)
            .order(SortOrder::Asc),
        field!(RecipeInstruction, instruction, Text).check(REQUIRED),
    ];
}

/// One row of the derived shopping list. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShoppingListItem {
    pub food_id: Option<i64>,
    pub quantity: Option<f64>,
    #[serde(skip)]
    pub food: Related<FoodItem>,
}

impl Entity for ShoppingListItem {
    const NAME: &'static str = "ShoppingListItem";
    const TABLE: &'static str = "shopping_list_item";
    const FIELDS: &'static [Field<Self>] = &[
        field!(ShoppingListItem, food_id, Integer).order(SortOrder::Asc),
        field!(ShoppingListItem, quantity, Decimal),
    ];
}

impl ShoppingListItem {
    pub fn food_item(&self, session: &impl Session) -> Result<&FoodItem> {
        self.food.get_or_try_load(|| {
            load_one(
                session,
                self.food_id.map(FoodItem::with_id),
                Self::NAME,
                describe_key(self.food_id),
            )
        })
    }

    pub fn clear_cache(&mut self) {
        self.food.invalidate();
    }
}
