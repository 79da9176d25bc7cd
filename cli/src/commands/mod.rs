mod food;
mod fridge;
mod helpers;
mod plan;
mod recipe;
mod shopping;

pub(crate) use food::{
    Nutrition, cmd_food_add, cmd_food_delete, cmd_food_list, cmd_food_show, cmd_food_update,
};
pub(crate) use fridge::{cmd_fridge_add, cmd_fridge_list, cmd_fridge_set};
pub(crate) use plan::{
    cmd_plan_add_meal, cmd_plan_create, cmd_plan_delete, cmd_plan_list, cmd_plan_remove_meal,
    cmd_plan_show,
};
pub(crate) use recipe::{
    cmd_recipe_add_ingredient, cmd_recipe_add_step, cmd_recipe_create, cmd_recipe_delete,
    cmd_recipe_list, cmd_recipe_remove_ingredient, cmd_recipe_show,
};
pub(crate) use shopping::cmd_shopping;
