//! Weekly meal plan types.
//!
//! A `WeekPlan` maps a day index (0 = Monday, 6 = Sunday) to the five meal
//! slots of that day. On the wire the day index is a string key, matching the
//! JSON objects written by earlier versions of the app.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Number of days in a plan.
pub const DAYS_PER_WEEK: u8 = 7;

/// A meal slot within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MealSlot {
    /// Breakfast.
    Breakfast,
    /// Mid-morning snack.
    MorningSnack,
    /// Lunch.
    Lunch,
    /// Afternoon snack.
    AfternoonSnack,
    /// Dinner.
    Dinner,
}

impl MealSlot {
    /// All slots in display order.
    pub const ALL: [Self; 5] = [
        Self::Breakfast,
        Self::MorningSnack,
        Self::Lunch,
        Self::AfternoonSnack,
        Self::Dinner,
    ];
}

/// The meals planned for a single day. Empty strings mean "nothing planned".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DayPlan {
    /// Breakfast.
    pub breakfast: String,
    /// Mid-morning snack.
    pub morning_snack: String,
    /// Lunch.
    pub lunch: String,
    /// Afternoon snack.
    pub afternoon_snack: String,
    /// Dinner.
    pub dinner: String,
}

impl DayPlan {
    /// The meal planned for a slot.
    #[must_use]
    pub fn get(&self, slot: MealSlot) -> &str {
        match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::MorningSnack => &self.morning_snack,
            MealSlot::Lunch => &self.lunch,
            MealSlot::AfternoonSnack => &self.afternoon_snack,
            MealSlot::Dinner => &self.dinner,
        }
    }

    /// Replace the meal planned for a slot.
    pub fn set(&mut self, slot: MealSlot, meal: impl Into<String>) {
        let field = match slot {
            MealSlot::Breakfast => &mut self.breakfast,
            MealSlot::MorningSnack => &mut self.morning_snack,
            MealSlot::Lunch => &mut self.lunch,
            MealSlot::AfternoonSnack => &mut self.afternoon_snack,
            MealSlot::Dinner => &mut self.dinner,
        };
        *field = meal.into();
    }

    /// Whether no meal is planned for any slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        MealSlot::ALL.iter().all(|slot| self.get(*slot).is_empty())
    }
}

/// A week of day plans keyed by day index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, DayPlan>", into = "BTreeMap<String, DayPlan>")]
pub struct WeekPlan {
    days: BTreeMap<u8, DayPlan>,
}

impl WeekPlan {
    /// A plan with all seven days present and empty.
    #[must_use]
    pub fn empty_week() -> Self {
        Self {
            days: (0..DAYS_PER_WEEK).map(|day| (day, DayPlan::default())).collect(),
        }
    }

    /// The plan for a day, if that day has an entry.
    #[must_use]
    pub fn day(&self, day: u8) -> Option<&DayPlan> {
        self.days.get(&day)
    }

    /// The meal planned for a day and slot. Missing days read as empty.
    #[must_use]
    pub fn meal(&self, day: u8, slot: MealSlot) -> &str {
        self.days.get(&day).map_or("", |plan| plan.get(slot))
    }

    /// Plan a meal, creating the day entry if needed.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::InvalidDay` if `day` is not in `0..7`.
    pub fn set_meal(&mut self, day: u8, slot: MealSlot, meal: impl Into<String>) -> Result<()> {
        if day >= DAYS_PER_WEEK {
            return Err(PlannerError::InvalidDay(day));
        }
        self.days.entry(day).or_default().set(slot, meal);
        Ok(())
    }

    /// Clear a planned meal, leaving the slot empty.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::InvalidDay` if `day` is not in `0..7`.
    pub fn clear_meal(&mut self, day: u8, slot: MealSlot) -> Result<()> {
        self.set_meal(day, slot, String::new())
    }

    /// Iterate over the days that have an entry, in day order.
    pub fn days(&self) -> impl Iterator<Item = (u8, &DayPlan)> {
        self.days.iter().map(|(day, plan)| (*day, plan))
    }

    /// Whether the plan has no day entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl TryFrom<BTreeMap<String, DayPlan>> for WeekPlan {
    type Error = String;

    fn try_from(raw: BTreeMap<String, DayPlan>) -> std::result::Result<Self, Self::Error> {
        let days = raw
            .into_iter()
            .map(|(key, plan)| match key.parse::<u8>() {
                Ok(day) if day < DAYS_PER_WEEK => Ok((day, plan)),
                _ => Err(format!("invalid day key in week plan: {key}")),
            })
            .collect::<std::result::Result<_, _>>()?;
        Ok(Self { days })
    }
}

impl From<WeekPlan> for BTreeMap<String, DayPlan> {
    fn from(plan: WeekPlan) -> Self {
        plan.days
            .into_iter()
            .map(|(day, plan)| (day.to_string(), plan))
            .collect()
    }
}
