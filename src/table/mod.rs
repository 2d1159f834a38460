//! Plain-text table rendering.
//!
//! A table is a list of rows of string cells; a style string such as
//! `|r|r|l:30|` describes borders, per-column alignment, and optional
//! width limits. `render` is a pure function from those inputs to one
//! multi-line string.

mod grid;
mod layout;
mod style;
mod wrap;

pub use style::{Align, StyleSpec, Token};

pub(crate) use wrap::justify;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("invalid style: {0}")]
    Grammar(String),
    #[error("cannot render an empty table")]
    EmptyTable,
}

/// Render `table` as a bordered monospace grid.
///
/// `row_style` and `col_style` default to all-centered slots with a
/// border before each slot and after the last. Width limits may come
/// from the column style itself (`l:15`) or from `limits`; an explicit
/// `limits` entry wins over the style's own limit for that column.
pub fn render<S: AsRef<str>>(
    table: &[Vec<S>],
    row_style: Option<&StyleSpec>,
    col_style: Option<&StyleSpec>,
    limits: Option<&[Option<usize>]>,
) -> Result<String, RenderError> {
    if table.is_empty() {
        return Err(RenderError::EmptyTable);
    }
    let num_cols = table[0].len();

    let default_rows;
    let row_style = match row_style {
        Some(spec) => spec,
        None => {
            default_rows = StyleSpec::default_for(table.len());
            &default_rows
        }
    };
    let default_cols;
    let col_style = match col_style {
        Some(spec) => spec,
        None => {
            default_cols = StyleSpec::default_for(num_cols);
            &default_cols
        }
    };

    layout::validate_shape(table, col_style, row_style)?;

    let mut merged = col_style.limits.clone();
    if let Some(limits) = limits {
        if limits.len() != num_cols {
            return Err(RenderError::ShapeMismatch(format!(
                "{} width limits given for {num_cols} columns",
                limits.len()
            )));
        }
        for (slot, limit) in merged.iter_mut().zip(limits) {
            if limit.is_some() {
                *slot = *limit;
            }
        }
    }

    let widths = layout::column_widths(table, &merged);
    let aligns = col_style.aligns();
    let rows: Vec<_> = table
        .iter()
        .map(|row| wrap::wrap_row(row, &aligns, &widths))
        .collect();
    Ok(grid::render_grid(&rows, row_style, col_style, &widths))
}
