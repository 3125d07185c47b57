use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde::Serialize;
use warp::{
    http::{header, HeaderValue},
    reply::Response,
};

use crate::constants::{SHOPPING_LIST_HEADER, SHOPPING_LIST_SUFFIX};

use super::{error::Error, schema::Profile};

/*
Shopping list report

Shopping list for: Ivan Petrov

- flour (g) - 500
- salt (g) - 10
*/

/// One ingredient row of a recipe sitting in somebody's shopping cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct CartIngredient {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums amounts per (name, unit) pair, ordered by name and then unit.
pub fn aggregate<I>(rows: I) -> Vec<ShoppingListLine>
where
    I: IntoIterator<Item = CartIngredient>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListLine {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingList {
    pub owner: String,
    pub username: String,
    pub lines: Vec<ShoppingListLine>,
}

impl ShoppingList {
    /// An empty cart has nothing to report and is rejected.
    pub fn new(owner: &Profile, lines: Vec<ShoppingListLine>) -> Result<Self, Error> {
        if lines.is_empty() {
            return Err(Error::EmptyShoppingList);
        }

        Ok(Self {
            owner: owner.full_name(),
            username: owner.username.to_owned(),
            lines,
        })
    }

    pub fn filename(&self) -> String {
        format!("{}{SHOPPING_LIST_SUFFIX}", self.username)
    }

    /// `Content-Disposition` value. Names outside printable ASCII get an
    /// underscored `filename` fallback plus a percent-encoded `filename*`.
    pub fn content_disposition(&self) -> String {
        let filename = self.filename();
        let fallback: String = filename
            .chars()
            .map(|c| match c {
                '"' | '\\' => '_',
                c if c.is_ascii_graphic() => c,
                _ => '_',
            })
            .collect();

        if fallback == filename {
            return format!("attachment; filename=\"{filename}\"");
        }

        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(&filename)
        )
    }
}

impl Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SHOPPING_LIST_HEADER}: {}\n\n", self.owner)?;

        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "- {} ({}) - {}",
                line.name, line.measurement_unit, line.amount
            )?;
        }

        Ok(())
    }
}

impl warp::Reply for ShoppingList {
    fn into_response(self) -> Response {
        let disposition = HeaderValue::from_str(&self.content_disposition());

        let mut response = Response::new(self.to_string().into());
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        match disposition {
            Ok(value) => {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
            Err(e) => log::warn!("Can't encode shopping list filename: {e}"),
        }

        response
    }
}
