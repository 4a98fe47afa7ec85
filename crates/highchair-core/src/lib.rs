//! Core types and utilities for highchair.
//!
//! This crate provides the domain types shared by the store and the application:
//!
//! - **Users**: `User`, `SessionUser`, `Gender` and the signup validation rules
//! - **Week plan**: `WeekPlan`, `DayPlan`, `MealSlot`
//! - **Groceries**: `GroceryList`, `GroceryItem`
//! - **Food tracking**: `FoodTracking`, `FoodItem`, `FoodCategory`, `FoodTag`
//!
//! The store persists these values opaquely; nothing here knows about storage.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod grocery;
pub mod meal;
pub mod tracking;
pub mod user;

pub use error::{PlannerError, Result};
pub use grocery::{GroceryItem, GroceryList};
pub use meal::{DayPlan, MealSlot, WeekPlan, DAYS_PER_WEEK};
pub use tracking::{FoodCategory, FoodItem, FoodTag, FoodTracking};
pub use user::{validate_signup, Gender, SessionUser, User, MIN_PASSWORD_LEN};
