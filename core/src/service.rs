use std::collections::HashSet;

use anyhow::{Context, Result};
use tracing::info;

use crate::mapper;
use crate::models::{
    FoodItem, FridgeItem, Meal, MealPlan, Recipe, RecipeIngredient, RecipeInstruction,
    ShoppingListItem,
};
use crate::session::Session;

/// Multi-entity workflows on top of the mapper.
///
/// Saves are sequences of independent statements: a failure part-way leaves
/// the earlier writes in place.
pub struct Planner<'a, S: Session> {
    session: &'a S,
}

impl<'a, S: Session> Planner<'a, S> {
    #[must_use]
    pub fn new(session: &'a S) -> Self {
        Self { session }
    }

    /// Save a recipe along with its edited ingredient and instruction lists.
    ///
    /// Stored children missing from the lists are deleted. Every listed child
    /// is stamped with the recipe id, validated, then inserted or updated.
    pub fn save_recipe(
        &self,
        recipe: &mut Recipe,
        ingredients: &mut [RecipeIngredient],
        instructions: &mut [RecipeInstruction],
    ) -> Result<()> {
        mapper::validate(recipe)?;

        let mut stored_foods = HashSet::new();
        match recipe.id {
            None => mapper::insert(self.session, recipe).context("Failed to create recipe")?,
            Some(id) => {
                let stored = Recipe::with_id(id);
                for ingredient in stored.ingredients(self.session)? {
                    if ingredients.iter().any(|i| i.food_id == ingredient.food_id) {
                        stored_foods.insert(ingredient.food_id);
                    } else {
                        mapper::delete(self.session, ingredient)?;
                    }
                }
                for instruction in stored.instructions(self.session)? {
                    if !instructions.iter().any(|i| i.id == instruction.id) {
                        mapper::delete(self.session, instruction)?;
                    }
                }
                mapper::update(self.session, recipe).context("Failed to update recipe")?;
            }
        }
        recipe.clear_cache();

        for ingredient in ingredients.iter_mut() {
            ingredient.recipe_id = recipe.id;
            mapper::validate(ingredient)?;
            if stored_foods.contains(&ingredient.food_id) {
                mapper::update(self.session, ingredient)?;
            } else {
                mapper::insert(self.session, ingredient)?;
            }
        }
        for instruction in instructions.iter_mut() {
            instruction.recipe_id = recipe.id;
            mapper::validate(instruction)?;
            if instruction.id.is_some() {
                mapper::update(self.session, instruction)?;
            } else {
                mapper::insert(self.session, instruction)?;
            }
        }

        info!(
            recipe = ?recipe.id,
            ingredients = ingredients.len(),
            instructions = instructions.len(),
            "saved recipe"
        );
        Ok(())
    }

    /// Save a meal plan and its meals. Meals are validated before anything is
    /// written; their plan id is filled in afterwards.
    pub fn save_meal_plan(&self, plan: &mut MealPlan, meals: &mut [Meal]) -> Result<()> {
        mapper::validate(plan)?;
        for meal in meals.iter() {
            let probe = Meal {
                plan_id: Some(plan.id.unwrap_or_default()),
                ..meal.clone()
            };
            mapper::validate(&probe)?;
        }

        match plan.id {
            None => mapper::insert(self.session, plan).context("Failed to create meal plan")?,
            Some(id) => {
                let stored = MealPlan {
                    id: Some(id),
                    ..MealPlan::default()
                };
                for meal in stored.meals(self.session)? {
                    if !meals.iter().any(|m| m.id.is_some() && m.id == meal.id) {
                        mapper::delete(self.session, meal)?;
                    }
                }
                mapper::update(self.session, plan).context("Failed to update meal plan")?;
            }
        }
        plan.clear_cache();

        for meal in meals.iter_mut() {
            meal.plan_id = plan.id;
            if meal.id.is_some() {
                mapper::update(self.session, meal)?;
            } else {
                mapper::insert(self.session, meal)?;
            }
        }

        info!(plan = ?plan.id, meals = meals.len(), "saved meal plan");
        Ok(())
    }

    /// Everything still to buy for the planned meals, with foods resolved.
    pub fn shopping_list(&self) -> Result<Vec<ShoppingListItem>> {
        let items = mapper::select(self.session, &ShoppingListItem::default())?;
        for item in &items {
            item.food_item(self.session)?;
        }
        Ok(items)
    }

    pub fn fridge_contents(&self) -> Result<Vec<FridgeItem>> {
        let items = mapper::select(self.session, &FridgeItem::default())?;
        for item in &items {
            item.food_item(self.session)?;
        }
        Ok(items)
    }

    /// Foods whose name contains `term`; all foods for a blank term.
    pub fn food_search(&self, term: &str) -> Result<Vec<FoodItem>> {
        let term = term.trim();
        let criteria = FoodItem {
            name: (!term.is_empty()).then(|| format!("%{term}%")),
            ..FoodItem::default()
        };
        Ok(mapper::select(self.session, &criteria)?)
    }
}
