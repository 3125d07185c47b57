use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use crate::config::Pagination;

use super::{
    error::{Error, ValidationError},
    pagination::PageRequest,
    schema::RecipeFilter,
};

pub type FormData = HashMap<String, Value>;

/// Typed access to query or form parameters.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn from_query(query: HashMap<String, String>) -> Self {
        Self {
            inner: query
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        }
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(Value::Number(n)) => n
                .to_string()
                .parse()
                .map(Some)
                .map_err(|_e| invalid(key)),
            Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
            Some(Value::String(v)) => v.trim().parse().map(Some).map_err(|_e| invalid(key)),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(invalid(key)),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<Option<String>, Error> {
        match self.inner.get(key) {
            Some(Value::String(v)) => Ok(Some(v.to_string())),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(invalid(key)),
        }
    }

    /// Accepts `1`/`0`, `true`/`false` and JSON booleans; absent means false.
    pub fn get_flag(&self, key: &str) -> Result<bool, Error> {
        match self.inner.get(key) {
            Some(Value::Bool(v)) => Ok(*v),
            Some(Value::Number(n)) => Ok(n.as_i64().unwrap_or(0) != 0),
            Some(Value::String(v)) => match v.trim().to_lowercase().as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" | "" => Ok(false),
                _ => Err(invalid(key)),
            },
            Some(Value::Null) | None => Ok(false),
            Some(_) => Err(invalid(key)),
        }
    }

    /// Accepts a JSON array of strings or a comma separated string.
    pub fn get_list(&self, key: &str) -> Result<Vec<String>, Error> {
        match self.inner.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| {
                    value
                        .as_str()
                        .map(|v| v.to_string())
                        .ok_or_else(|| invalid(key))
                })
                .collect(),
            Some(Value::String(v)) => Ok(v
                .split(',')
                .map(|part| part.trim())
                .filter(|part| !part.is_empty())
                .map(|part| part.to_string())
                .collect()),
            Some(Value::Null) | None => Ok(vec![]),
            Some(_) => Err(invalid(key)),
        }
    }

    pub fn page_request(&self, settings: &Pagination) -> Result<PageRequest, Error> {
        let request = PageRequest::new(
            self.get_number("page")?,
            self.get_number("limit")?,
            settings,
        );
        if request.checked_offset().is_none() {
            return Err(invalid("page"));
        }

        Ok(request)
    }

    pub fn recipes_limit(&self) -> Result<Option<usize>, Error> {
        self.get_number("recipes_limit")
    }

    pub fn recipe_filter(&self) -> Result<RecipeFilter, Error> {
        Ok(RecipeFilter {
            tags: self.get_list("tags")?,
            author: self.get_number("author")?,
            is_favorited: self.get_flag("is_favorited")?,
            is_in_shopping_cart: self.get_flag("is_in_shopping_cart")?,
        })
    }
}

fn invalid(key: &str) -> Error {
    ValidationError::InvalidParameter(key.to_string()).into()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn query(pairs: &[(&str, &str)]) -> Form {
        Form::from_query(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn recipe_filter_from_query() {
        let form = query(&[
            ("tags", "breakfast, lunch"),
            ("author", "4"),
            ("is_favorited", "1"),
        ]);
        let filter = form.recipe_filter().unwrap();

        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
        assert_eq!(filter.author, Some(4));
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
    }

    #[test]
    fn recipe_filter_from_json() {
        let mut data = FormData::new();
        data.insert(String::from("tags"), json!(["dinner"]));
        data.insert(String::from("is_in_shopping_cart"), json!(true));
        data.insert(String::from("author"), json!(2));
        let filter = Form::from_data(data).recipe_filter().unwrap();

        assert_eq!(filter.tags, vec!["dinner"]);
        assert_eq!(filter.author, Some(2));
        assert!(filter.is_in_shopping_cart);
    }

    #[test]
    fn empty_query_is_default_filter() {
        assert_eq!(query(&[]).recipe_filter().unwrap(), RecipeFilter::default());
    }

    #[test]
    fn invalid_values_name_the_parameter() {
        let err = query(&[("author", "me")]).recipe_filter().unwrap_err();
        match err {
            Error::Validation(e) => assert_eq!(e.field(), "author"),
            e => panic!("unexpected error {e:?}"),
        }

        assert!(query(&[("is_favorited", "maybe")]).recipe_filter().is_err());
    }

    #[test]
    fn page_request_and_recipes_limit() {
        let form = query(&[("page", "2"), ("limit", "50"), ("recipes_limit", "3")]);
        let request = form.page_request(&Pagination::default()).unwrap();

        assert_eq!(request, PageRequest { page: 2, limit: 10 });
        assert_eq!(form.recipes_limit().unwrap(), Some(3));
        assert_eq!(query(&[]).recipes_limit().unwrap(), None);
        assert!(query(&[("recipes_limit", "-1")]).recipes_limit().is_err());
    }

    #[test]
    fn unreachable_page_is_rejected() {
        let max = i64::MAX.to_string();
        let err = query(&[("page", max.as_str())])
            .page_request(&Pagination::default())
            .unwrap_err();
        match err {
            Error::Validation(e) => assert_eq!(e.field(), "page"),
            e => panic!("unexpected error {e:?}"),
        }

        // the largest page whose offset still fits
        let last = (i64::MAX / 6 + 1).to_string();
        let request = query(&[("page", last.as_str()), ("limit", "6")])
            .page_request(&Pagination::default())
            .unwrap();
        assert_eq!(request.offset(), (i64::MAX / 6) * 6);
    }
}
