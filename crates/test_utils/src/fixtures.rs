//! Catalogue Test Fixtures
//!
//! Predictable rows for the catalogue tables and helpers to insert them on
//! a connection, usually the one borrowed from a session.

use chrono::{NaiveDate, NaiveDateTime};
use infra_db::schema::{
    Brand, Category, Condition, Customer, CustomerModel, Model, Packaging, Shop, ShopProduct, Tier,
};
use sqlx::PgConnection;
use uuid::Uuid;

pub struct CatalogueFixtures;

impl CatalogueFixtures {
    pub fn brand() -> Brand {
        Brand {
            id: Uuid::new_v4(),
            country: "JP".to_string(),
            tier: Tier::Top,
        }
    }

    /// A limited-series category
    pub fn limited_category() -> Category {
        Category {
            id: Uuid::new_v4(),
            is_limited: true,
            description: Some("Premium limited series".to_string()),
        }
    }

    pub fn model(brand: &Brand, category: &Category) -> Model {
        Model {
            id: Uuid::new_v4(),
            brand_id: brand.id,
            model_id: Some("T64-R".to_string()),
            car_brand: "Nissan".to_string(),
            category_id: category.id,
            has_chase_version: false,
            release_year: Some("2024".to_string()),
        }
    }

    pub fn shop() -> Shop {
        Shop {
            id: Uuid::new_v4(),
            country: "DE".to_string(),
            ships_to_czech: true,
            shipping_fee: Some(9.9),
            other_fees: None,
            free_shipping_from_price: 150.0,
            is_in_eu_market: true,
        }
    }

    pub fn customer_model(model: &Model) -> CustomerModel {
        CustomerModel {
            id: Uuid::new_v4(),
            model_id: model.id,
            price: 420.0,
            condition: Condition::Unpacked,
        }
    }

    pub fn customer() -> Customer {
        Customer {
            id: Uuid::new_v4(),
            first_name: "Jana".to_string(),
            last_name: "Novakova".to_string(),
            email: "jana@example.com".to_string(),
            username: "jnovakova".to_string(),
            password: "hashed-password".to_string(),
            country: "CZ".to_string(),
            is_active: true,
            currency: "CZK".to_string(),
        }
    }

    /// A last-piece listing priced in EUR, scraped at a fixed time
    pub fn shop_product(shop: &Shop, model: &Model) -> ShopProduct {
        let scraped_at = scraped_at();
        ShopProduct {
            id: Uuid::new_v4(),
            shop_id: shop.id,
            price: 24.5,
            currency: "EUR".to_string(),
            price_in_czk: 612.5,
            conversion_rate: 25.0,
            model_id: model.id,
            created_at: scraped_at,
            updated_at: scraped_at,
            original_name: "Tomica Premium Nissan Skyline GT-R".to_string(),
            is_last: true,
            condition: Condition::New,
            packaging: Packaging::Blister,
        }
    }
}

fn scraped_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 24)
        .and_then(|date| date.and_hms_opt(12, 30, 0))
        .unwrap_or_default()
}

pub async fn insert_brand(conn: &mut PgConnection, brand: &Brand) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO brands (id, country, tier) VALUES ($1, $2, $3)")
        .bind(brand.id)
        .bind(&brand.country)
        .bind(brand.tier)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_category(
    conn: &mut PgConnection,
    category: &Category,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO categories (id, is_limited, description) VALUES ($1, $2, $3)")
        .bind(category.id)
        .bind(category.is_limited)
        .bind(&category.description)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_model(conn: &mut PgConnection, model: &Model) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO models (id, brand_id, model_id, car_brand, category_id, has_chase_version, release_year)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(model.id)
    .bind(model.brand_id)
    .bind(&model.model_id)
    .bind(&model.car_brand)
    .bind(model.category_id)
    .bind(model.has_chase_version)
    .bind(&model.release_year)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_shop(conn: &mut PgConnection, shop: &Shop) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO shops (id, country, ships_to_czech, shipping_fee, other_fees, free_shipping_from_price, is_in_eu_market)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(shop.id)
    .bind(&shop.country)
    .bind(shop.ships_to_czech)
    .bind(shop.shipping_fee)
    .bind(shop.other_fees)
    .bind(shop.free_shipping_from_price)
    .bind(shop.is_in_eu_market)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_customer_model(
    conn: &mut PgConnection,
    customer_model: &CustomerModel,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO customer_models (id, model_id, price, condition) VALUES ($1, $2, $3, $4)")
        .bind(customer_model.id)
        .bind(customer_model.model_id)
        .bind(customer_model.price)
        .bind(customer_model.condition)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_customer(
    conn: &mut PgConnection,
    customer: &Customer,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO customers (id, first_name, last_name, email, username, password, country, is_active, currency)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(customer.id)
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(&customer.email)
    .bind(&customer.username)
    .bind(&customer.password)
    .bind(&customer.country)
    .bind(customer.is_active)
    .bind(&customer.currency)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_shop_product(
    conn: &mut PgConnection,
    product: &ShopProduct,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO shop_products (
            id, shop_id, price, currency, price_in_czk, conversion_rate, model_id,
            created_at, updated_at, original_name, is_last, condition, packaging
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(product.id)
    .bind(product.shop_id)
    .bind(product.price)
    .bind(&product.currency)
    .bind(product.price_in_czk)
    .bind(product.conversion_rate)
    .bind(product.model_id)
    .bind(product.created_at)
    .bind(product.updated_at)
    .bind(&product.original_name)
    .bind(product.is_last)
    .bind(product.condition)
    .bind(product.packaging)
    .execute(conn)
    .await?;
    Ok(())
}
