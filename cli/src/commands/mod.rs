mod chat;
mod grocery;
mod helpers;
mod plan;
mod recipe;

pub(crate) use chat::cmd_chat;
pub(crate) use grocery::cmd_grocery;
pub(crate) use plan::{cmd_plan_assign, cmd_plan_clear, cmd_plan_show};
pub(crate) use recipe::{
    DEFAULT_COOKING_TIME, DEFAULT_SERVINGS, RecipeEdits, cmd_recipe_add, cmd_recipe_delete,
    cmd_recipe_edit, cmd_recipe_import, cmd_recipe_list, cmd_recipe_show, cmd_recipe_tags,
};
