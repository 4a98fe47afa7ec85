//! Food tracking types.
//!
//! Tracks how many times the child has tried each food, grouped by category.
//! A fresh tracker starts from a built-in catalogue with every count at zero;
//! users may add their own foods on top of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Nutritional tags shown as badges on a food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FoodTag {
    /// Common allergen.
    Alergeno,
    /// Rich in vitamin C.
    VitaminaC,
    /// Rich in iron.
    Hierro,
}

/// Food categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodCategory {
    /// Proteins.
    Proteinas,
    /// Vegetables.
    Verduras,
    /// Fruits.
    Frutas,
    /// Cereals and grains.
    Cereales,
    /// Fats.
    Grasas,
}

impl FoodCategory {
    /// All categories in display order.
    pub const ALL: [Self; 5] = [
        Self::Proteinas,
        Self::Verduras,
        Self::Frutas,
        Self::Cereales,
        Self::Grasas,
    ];
}

/// A food and how many times it has been tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    /// Unique food ID (`p1`, `v3`, `custom_...`).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Times tried.
    #[serde(default)]
    pub count: u32,

    /// Set for foods added by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<bool>,

    /// Nutritional tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<FoodTag>>,
}

impl FoodItem {
    fn catalogue(id: &str, name: &str, tags: &[FoodTag]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            count: 0,
            custom: None,
            tags: (!tags.is_empty()).then(|| tags.to_vec()),
        }
    }

    /// Whether the food carries a tag.
    #[must_use]
    pub fn has_tag(&self, tag: FoodTag) -> bool {
        self.tags.as_ref().is_some_and(|tags| tags.contains(&tag))
    }
}

/// Foods tried, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoodTracking(BTreeMap<FoodCategory, Vec<FoodItem>>);

impl FoodTracking {
    /// The built-in catalogue with all counts at zero.
    #[must_use]
    pub fn initial() -> Self {
        use FoodTag::{Alergeno, Hierro, VitaminaC};

        let mut foods = BTreeMap::new();
        foods.insert(
            FoodCategory::Proteinas,
            vec![
                FoodItem::catalogue("p1", "Pollo", &[Hierro]),
                FoodItem::catalogue("p2", "Huevo", &[Alergeno, Hierro]),
                FoodItem::catalogue("p3", "Pescado", &[Alergeno, Hierro]),
                FoodItem::catalogue("p4", "Legumbres", &[Hierro]),
                FoodItem::catalogue("p5", "Carne de res", &[Hierro]),
            ],
        );
        foods.insert(
            FoodCategory::Verduras,
            vec![
                FoodItem::catalogue("v1", "Zanahoria", &[VitaminaC]),
                FoodItem::catalogue("v2", "Calabaza", &[VitaminaC]),
                FoodItem::catalogue("v3", "Papa", &[]),
                FoodItem::catalogue("v4", "Espinaca", &[Hierro, VitaminaC]),
                FoodItem::catalogue("v5", "Brócoli", &[VitaminaC, Hierro]),
            ],
        );
        foods.insert(
            FoodCategory::Frutas,
            vec![
                FoodItem::catalogue("f1", "Manzana", &[VitaminaC]),
                FoodItem::catalogue("f2", "Pera", &[]),
                FoodItem::catalogue("f3", "Banano", &[]),
                FoodItem::catalogue("f4", "Papaya", &[VitaminaC]),
                FoodItem::catalogue("f5", "Mango", &[VitaminaC]),
                FoodItem::catalogue("f6", "Guayaba", &[VitaminaC]),
                FoodItem::catalogue("f7", "Durazno", &[VitaminaC]),
                FoodItem::catalogue("f8", "Ciruela", &[]),
                FoodItem::catalogue("f9", "Fresa", &[VitaminaC, Alergeno]),
                FoodItem::catalogue("f10", "Kiwi", &[VitaminaC, Alergeno]),
            ],
        );
        foods.insert(
            FoodCategory::Cereales,
            vec![
                FoodItem::catalogue("c1", "Arroz", &[]),
                FoodItem::catalogue("c2", "Avena", &[Hierro]),
                FoodItem::catalogue("c3", "Quinoa", &[Hierro]),
                FoodItem::catalogue("c4", "Maíz", &[]),
                FoodItem::catalogue("c5", "Trigo", &[Alergeno]),
            ],
        );
        foods.insert(
            FoodCategory::Grasas,
            vec![
                FoodItem::catalogue("g1", "Aguacate", &[]),
                FoodItem::catalogue("g2", "Aceite de oliva", &[]),
                FoodItem::catalogue("g3", "Aceite de coco", &[]),
                FoodItem::catalogue("g4", "Semillas de chía", &[]),
                FoodItem::catalogue("g5", "Mantequilla natural", &[]),
                FoodItem::catalogue("g6", "Frutos secos", &[Alergeno]),
            ],
        );
        Self(foods)
    }

    /// Foods in a category.
    #[must_use]
    pub fn foods(&self, category: FoodCategory) -> &[FoodItem] {
        self.0.get(&category).map_or(&[][..], Vec::as_slice)
    }

    /// Look up a food by ID within a category.
    #[must_use]
    pub fn food(&self, category: FoodCategory, id: &str) -> Option<&FoodItem> {
        self.foods(category).iter().find(|food| food.id == id)
    }

    fn food_mut(&mut self, category: FoodCategory, id: &str) -> Option<&mut FoodItem> {
        self.0
            .get_mut(&category)?
            .iter_mut()
            .find(|food| food.id == id)
    }

    /// Record one more try of a food. Returns `false` if the food is unknown.
    pub fn increment(&mut self, category: FoodCategory, id: &str) -> bool {
        let Some(food) = self.food_mut(category, id) else {
            return false;
        };
        food.count = food.count.saturating_add(1);
        true
    }

    /// Undo one try of a food; the count never drops below zero.
    /// Returns `false` if the food is unknown.
    pub fn decrement(&mut self, category: FoodCategory, id: &str) -> bool {
        let Some(food) = self.food_mut(category, id) else {
            return false;
        };
        food.count = food.count.saturating_sub(1);
        true
    }

    /// Add a user-defined food at the end of a category.
    ///
    /// Blank names are ignored and return `None`.
    pub fn add_custom(
        &mut self,
        category: FoodCategory,
        name: &str,
        tags: &[FoodTag],
    ) -> Option<&FoodItem> {
        if name.trim().is_empty() {
            return None;
        }
        let foods = self.0.entry(category).or_default();
        foods.push(FoodItem {
            id: format!("custom_{}", uuid::Uuid::new_v4().simple()),
            name: name.to_string(),
            count: 0,
            custom: Some(true),
            tags: (!tags.is_empty()).then(|| tags.to_vec()),
        });
        foods.last()
    }

    /// Rename a food and replace its tags. Returns `false` if the food is
    /// unknown or the new name is blank.
    pub fn edit(&mut self, category: FoodCategory, id: &str, name: &str, tags: &[FoodTag]) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        match self.food_mut(category, id) {
            Some(food) => {
                food.name = name.to_string();
                food.tags = Some(tags.to_vec());
                true
            }
            None => false,
        }
    }

    /// Remove a food. Returns `false` if the food is unknown.
    pub fn remove(&mut self, category: FoodCategory, id: &str) -> bool {
        let Some(foods) = self.0.get_mut(&category) else {
            return false;
        };
        let before = foods.len();
        foods.retain(|food| food.id != id);
        foods.len() != before
    }

    /// Foods matching a search term and an optional tag, in category order.
    ///
    /// The search is a case- and accent-insensitive substring match on the
    /// name; an empty term matches everything.
    #[must_use]
    pub fn filter(&self, search: &str, tag: Option<FoodTag>) -> Vec<(FoodCategory, &FoodItem)> {
        let needle = normalize(search);
        self.0
            .iter()
            .flat_map(|(category, foods)| foods.iter().map(move |food| (*category, food)))
            .filter(|(_, food)| needle.is_empty() || normalize(&food.name).contains(&needle))
            .filter(|(_, food)| tag.map_or(true, |tag| food.has_tag(tag)))
            .collect()
    }

    /// Total number of tries across all foods.
    #[must_use]
    pub fn total_tries(&self) -> u64 {
        self.0
            .values()
            .flatten()
            .map(|food| u64::from(food.count))
            .sum()
    }
}

/// Lowercase and strip the diacritics used in Spanish food names.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
