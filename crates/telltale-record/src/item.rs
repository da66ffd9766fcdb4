//! Commerce-style structured items carried inside event payloads.

use serde_json::{Map, Value};

use crate::value::{Props, normalize_props, props_from_map};

/// A structured commerce item (product, promotion slot, list entry).
///
/// Flattens to a single-level map with snake-case keys. Free-form
/// `parameters` are written first, so structured fields win on collision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventItem {
    pub affiliation: Option<String>,
    pub coupon: Option<String>,
    pub creative_name: Option<String>,
    pub creative_slot: Option<String>,
    pub currency: Option<String>,
    pub discount: Option<f64>,
    pub index: Option<i64>,
    pub item_brand: Option<String>,
    pub item_category: Option<String>,
    pub item_category2: Option<String>,
    pub item_category3: Option<String>,
    pub item_category4: Option<String>,
    pub item_category5: Option<String>,
    pub item_id: Option<String>,
    pub item_list_id: Option<String>,
    pub item_list_name: Option<String>,
    pub item_name: Option<String>,
    pub item_variant: Option<String>,
    pub location_id: Option<String>,
    pub price: Option<f64>,
    pub promotion_id: Option<String>,
    pub promotion_name: Option<String>,
    pub quantity: Option<i64>,
    /// Free-form extra parameters.
    pub parameters: Props,
}

const TEXT_KEYS: [&str; 19] = [
    "affiliation",
    "coupon",
    "creative_name",
    "creative_slot",
    "currency",
    "item_brand",
    "item_category",
    "item_category2",
    "item_category3",
    "item_category4",
    "item_category5",
    "item_id",
    "item_list_id",
    "item_list_name",
    "item_name",
    "item_variant",
    "location_id",
    "promotion_id",
    "promotion_name",
];

impl EventItem {
    /// Create an item with an id and a name.
    pub fn new(item_id: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.into()),
            item_name: Some(item_name.into()),
            ..Self::default()
        }
    }

    /// Set the price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the quantity.
    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Set the currency code.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Set the category hierarchy, up to five levels. Extra levels are ignored.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut levels = categories.into_iter().map(Into::into);
        self.item_category = levels.next();
        self.item_category2 = levels.next();
        self.item_category3 = levels.next();
        self.item_category4 = levels.next();
        self.item_category5 = levels.next();
        self
    }

    /// Set the promotion fields.
    pub fn with_promotion(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.promotion_id = Some(id.into());
        self.promotion_name = Some(name.into());
        self
    }

    /// Set the coupon code.
    pub fn with_coupon(mut self, coupon: impl Into<String>) -> Self {
        self.coupon = Some(coupon.into());
        self
    }

    /// Add a free-form parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<crate::Prop>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    fn text_fields(&self) -> [&Option<String>; 19] {
        [
            &self.affiliation,
            &self.coupon,
            &self.creative_name,
            &self.creative_slot,
            &self.currency,
            &self.item_brand,
            &self.item_category,
            &self.item_category2,
            &self.item_category3,
            &self.item_category4,
            &self.item_category5,
            &self.item_id,
            &self.item_list_id,
            &self.item_list_name,
            &self.item_name,
            &self.item_variant,
            &self.location_id,
            &self.promotion_id,
            &self.promotion_name,
        ]
    }

    fn text_fields_mut(&mut self) -> [&mut Option<String>; 19] {
        [
            &mut self.affiliation,
            &mut self.coupon,
            &mut self.creative_name,
            &mut self.creative_slot,
            &mut self.currency,
            &mut self.item_brand,
            &mut self.item_category,
            &mut self.item_category2,
            &mut self.item_category3,
            &mut self.item_category4,
            &mut self.item_category5,
            &mut self.item_id,
            &mut self.item_list_id,
            &mut self.item_list_name,
            &mut self.item_name,
            &mut self.item_variant,
            &mut self.location_id,
            &mut self.promotion_id,
            &mut self.promotion_name,
        ]
    }

    /// Flatten into a single-level map.
    pub fn to_generic_map(&self) -> Map<String, Value> {
        let mut map = normalize_props(&self.parameters);

        for (key, field) in TEXT_KEYS.iter().zip(self.text_fields()) {
            if let Some(text) = field.as_deref().filter(|s| !s.is_empty()) {
                map.insert((*key).to_string(), Value::String(text.to_string()));
            }
        }

        let numbers = [
            ("discount", self.discount.and_then(serde_json::Number::from_f64)),
            ("index", self.index.map(Into::into)),
            ("price", self.price.and_then(serde_json::Number::from_f64)),
            ("quantity", self.quantity.map(Into::into)),
        ];
        for (key, number) in numbers {
            if let Some(number) = number {
                map.insert(key.to_string(), Value::Number(number));
            }
        }

        map
    }

    /// Read a flattened map back. Keys that are not structured fields, or
    /// whose value has the wrong type, end up in `parameters`.
    pub fn parse(source: &Value) -> Self {
        let Some(map) = source.as_object() else {
            return Self::default();
        };

        let mut item = Self::default();
        let mut rest = map.clone();

        for (key, field) in TEXT_KEYS.iter().zip(item.text_fields_mut()) {
            if let Some(Value::String(text)) = map.get(*key) {
                *field = Some(text.clone());
                rest.remove(*key);
            }
        }

        if let Some(discount) = map.get("discount").and_then(Value::as_f64) {
            item.discount = Some(discount);
            rest.remove("discount");
        }
        if let Some(index) = map.get("index").and_then(Value::as_i64) {
            item.index = Some(index);
            rest.remove("index");
        }
        if let Some(price) = map.get("price").and_then(Value::as_f64) {
            item.price = Some(price);
            rest.remove("price");
        }
        if let Some(quantity) = map.get("quantity").and_then(Value::as_i64) {
            item.quantity = Some(quantity);
            rest.remove("quantity");
        }

        item.parameters = props_from_map(&rest);
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flattens_with_snake_case_keys() {
        let item = EventItem::new("sku-1", "Mug")
            .with_price(12.5)
            .with_quantity(2)
            .with_categories(["home", "kitchen", "mugs"]);

        let map = item.to_generic_map();
        assert_eq!(map.get("item_id"), Some(&json!("sku-1")));
        assert_eq!(map.get("item_name"), Some(&json!("Mug")));
        assert_eq!(map.get("price"), Some(&json!(12.5)));
        assert_eq!(map.get("quantity"), Some(&json!(2)));
        assert_eq!(map.get("item_category3"), Some(&json!("mugs")));
        assert!(!map.contains_key("item_category4"));
        assert!(!map.contains_key("coupon"));
    }

    #[test]
    fn test_structured_fields_win_over_parameters() {
        let item = EventItem::new("sku-1", "Mug")
            .with_parameter("item_name", "shadowed")
            .with_parameter("color", "blue");

        let map = item.to_generic_map();
        assert_eq!(map.get("item_name"), Some(&json!("Mug")));
        assert_eq!(map.get("color"), Some(&json!("blue")));
    }

    #[test]
    fn test_category_levels_capped_at_five() {
        let item = EventItem::default().with_categories(["a", "b", "c", "d", "e", "f"]);
        assert_eq!(item.item_category5.as_deref(), Some("e"));
        assert_eq!(item.to_generic_map().len(), 5);
    }

    #[test]
    fn test_parse_keeps_unknown_keys_as_parameters() {
        let item = EventItem::parse(&json!({
            "item_id": "sku-9",
            "price": 3,
            "quantity": "many",
            "color": "red",
        }));

        assert_eq!(item.item_id.as_deref(), Some("sku-9"));
        assert_eq!(item.price, Some(3.0));
        assert_eq!(item.quantity, None);
        assert_eq!(item.parameters.len(), 2);
        assert!(item.parameters.contains_key("color"));
        assert!(item.parameters.contains_key("quantity"));
    }
}
