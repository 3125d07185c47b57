use std::collections::HashSet;

use crate::{
    config::Limits,
    constants::{MAX_EMAIL_LENGTH, MAX_USERNAME_LENGTH},
};

use super::{error::ValidationError, schema::RecipeInput};

/// Checks a recipe write model before anything touches the database.
///
/// Rules run in a fixed order so the first violation reported is stable:
/// ingredients present, ingredients unique, amounts in range, tags present,
/// tags unique, cooking time in range, then the name.
pub fn validate_recipe(input: &RecipeInput, limits: &Limits) -> Result<(), ValidationError> {
    if input.ingredients.is_empty() {
        return Err(ValidationError::IngredientsRequired);
    }

    let mut seen = HashSet::new();
    if let Some(part) = input.ingredients.iter().find(|part| !seen.insert(part.id)) {
        return Err(ValidationError::DuplicateIngredient(part.id));
    }

    if let Some(part) = input
        .ingredients
        .iter()
        .find(|part| !limits.amount.contains(&part.amount))
    {
        return Err(ValidationError::InvalidAmount(part.id));
    }

    if input.tags.is_empty() {
        return Err(ValidationError::TagsRequired);
    }

    let mut seen = HashSet::new();
    if let Some(tag) = input.tags.iter().find(|tag| !seen.insert(**tag)) {
        return Err(ValidationError::DuplicateTag(*tag));
    }

    if !limits.cooking_time.contains(&input.cooking_time) {
        return Err(ValidationError::InvalidCookingTime);
    }

    validate_name(&input.name, limits.max_name_length)
}

pub fn validate_name(name: &str, max_length: usize) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > max_length {
        return Err(ValidationError::InvalidName);
    }
    Ok(())
}

/// Letters, digits and `@ . + - _`, at most 150 characters.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LENGTH
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'));

    if !valid {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let valid = email.len() <= MAX_EMAIL_LENGTH
        && !email.chars().any(char::is_whitespace)
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };

    if !valid {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// `#RRGGBB`
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let valid = match color.strip_prefix('#') {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidColor);
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
        return Err(ValidationError::InvalidSlug);
    }
    Ok(())
}
