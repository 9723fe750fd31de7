// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::{DataError, DataResult};
use polars::prelude::{DataFrame, DataType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Categorical,
    Quantitative,
}
impl AttributeType {
    pub fn is_categorical(&self) -> bool {
        matches!(self, AttributeType::Categorical)
    }
    pub fn is_quantitative(&self) -> bool {
        matches!(self, AttributeType::Quantitative)
    }
    pub fn short_code(&self) -> &'static str {
        match self {
            AttributeType::Categorical => "C",
            AttributeType::Quantitative => "Q",
        }
    }
    /// Accepts both the long names and the single-letter codes.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "c" | "categorical" | "nominal" => Some(AttributeType::Categorical),
            "q" | "quantitative" | "numeric" => Some(AttributeType::Quantitative),
            _ => None,
        }
    }
    /// Strings and booleans group, everything numeric or temporal measures.
    pub fn from_dtype(dtype: &DataType) -> Self {
        use DataType::*;
        match dtype {
            Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 | Float32
            | Float64 | Date | Datetime(_, _) => AttributeType::Quantitative,
            _ => AttributeType::Categorical,
        }
    }
}
impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::Categorical => write!(f, "categorical"),
            AttributeType::Quantitative => write!(f, "quantitative"),
        }
    }
}
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
}
impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }
    pub fn categorical(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Categorical)
    }
    pub fn quantitative(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Quantitative)
    }
}
impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.attr_type.short_code())
    }
}

/// A value of an attribute slot: either a column or the "slot unused" marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    None,
    Attribute(Attribute),
}
impl SlotValue {
    pub fn attribute(&self) -> Option<&Attribute> {
        match self {
            SlotValue::None => None,
            SlotValue::Attribute(attr) => Some(attr),
        }
    }
    pub fn attr_type(&self) -> Option<AttributeType> {
        self.attribute().map(|a| a.attr_type)
    }
    pub fn name(&self) -> Option<&str> {
        self.attribute().map(|a| a.name.as_str())
    }
    pub fn is_none(&self) -> bool {
        matches!(self, SlotValue::None)
    }
}
impl From<Attribute> for SlotValue {
    fn from(attr: Attribute) -> Self {
        SlotValue::Attribute(attr)
    }
}
impl From<Option<Attribute>> for SlotValue {
    fn from(attr: Option<Attribute>) -> Self {
        attr.map_or(SlotValue::None, SlotValue::Attribute)
    }
}
impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::None => write!(f, "-"),
            SlotValue::Attribute(attr) => write!(f, "{}", attr.name),
        }
    }
}

/// Derives one attribute per column, in column order.
///
/// `overrides` forces the semantic type of named columns; names that do not
/// exist in `df` are rejected so a typo does not silently fall back to
/// inference.
pub fn infer_attributes(
    df: &DataFrame,
    overrides: &BTreeMap<String, AttributeType>,
) -> DataResult<Vec<Attribute>> {
    if df.width() == 0 {
        return Err(DataError::EmptyDataset);
    }
    for name in overrides.keys() {
        if df.column(name).is_err() {
            return Err(DataError::ColumnNotFound {
                column: name.clone(),
            });
        }
    }
    Ok(df
        .get_columns()
        .iter()
        .map(|column| {
            let name = column.name().to_string();
            let attr_type = overrides
                .get(&name)
                .copied()
                .unwrap_or_else(|| AttributeType::from_dtype(column.dtype()));
            Attribute::new(name, attr_type)
        })
        .collect())
}
