//! Row types for the catalogue tables
//!
//! The tables themselves are created by `migrations/20260124_000001_initial_schema.sql`;
//! these structs only mirror their columns so rows can be read with
//! `sqlx::query_as`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Market tier of a diecast brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tierenum", rename_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Top,
    Middle,
    Low,
}

/// Condition of a listed or owned model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "conditionenum", rename_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    New,
    Unpacked,
    Used,
    Damaged,
}

/// How a listed model is packaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "packageenum", rename_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum Packaging {
    Box,
    Blister,
    Without,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Brand {
    pub id: Uuid,
    pub country: String,
    pub tier: Tier,
}

/// Limited collections are told apart by their category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub is_limited: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub country: String,
    pub is_active: bool,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Shop {
    pub id: Uuid,
    pub country: String,
    pub ships_to_czech: bool,
    pub shipping_fee: Option<f64>,
    pub other_fees: Option<f64>,
    pub free_shipping_from_price: f64,
    pub is_in_eu_market: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Model {
    pub id: Uuid,
    pub brand_id: Uuid,
    /// Manufacturer's catalogue number
    pub model_id: Option<String>,
    pub car_brand: String,
    pub category_id: Uuid,
    pub has_chase_version: bool,
    pub release_year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CustomerModel {
    pub id: Uuid,
    pub model_id: Uuid,
    pub price: f64,
    pub condition: Condition,
}

/// A model offered by a shop, with its price converted to CZK
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ShopProduct {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub price: f64,
    pub currency: String,
    pub price_in_czk: f64,
    pub conversion_rate: f64,
    pub model_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub original_name: String,
    pub is_last: bool,
    pub condition: Condition,
    pub packaging: Packaging,
}
