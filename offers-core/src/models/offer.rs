use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::Product;

/// A single product listing mirrored from the upstream catalog.
///
/// All display fields are opaque strings and may be empty. Only `id` carries
/// meaning: it is assigned upstream and identifies the offer in the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Offer {
    pub id: String,
    pub title: String,
    pub price: String,
    pub currency: String,
    pub image_url: String,
    pub description: String,
    pub merchant_url: String,
}

impl Offer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_price(mut self, price: impl Into<String>, currency: impl Into<String>) -> Self {
        self.price = price.into();
        self.currency = currency.into();
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_merchant_url(mut self, merchant_url: impl Into<String>) -> Self {
        self.merchant_url = merchant_url.into();
        self
    }

    /// Whether the offer can be written to a store.
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Case-insensitive substring match against the description.
    pub fn description_contains(&self, needle: &str) -> bool {
        self.description
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

impl From<Product> for Offer {
    fn from(product: Product) -> Self {
        let (price, currency) = product
            .price
            .map(|p| (p.value, p.currency))
            .unwrap_or_default();

        Self {
            id: product.id,
            title: product.title,
            price,
            currency,
            image_url: product.image_link,
            description: product.description,
            merchant_url: product.link,
        }
    }
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.id)?;
        if !self.price.is_empty() {
            write!(f, " - {} {}", self.price, self.currency)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Price;

    #[test]
    fn test_new_offer_has_empty_fields() {
        let offer = Offer::new("online:en:US:sku1");
        assert_eq!(offer.id, "online:en:US:sku1");
        assert!(offer.title.is_empty());
        assert!(offer.description.is_empty());
        assert!(offer.has_id());
    }

    #[test]
    fn test_empty_id_is_not_writable() {
        assert!(!Offer::default().has_id());
    }

    #[test]
    fn test_from_product_copies_fields_verbatim() {
        let product = Product {
            id: "online:en:US:sku1".to_string(),
            title: "Red Shoes".to_string(),
            price: Some(Price {
                value: "19.99".to_string(),
                currency: "USD".to_string(),
            }),
            image_link: "https://img.example.com/1.png".to_string(),
            description: "  Bright red  ".to_string(),
            link: "https://shop.example.com/1".to_string(),
        };

        let offer = Offer::from(product);
        assert_eq!(offer.id, "online:en:US:sku1");
        assert_eq!(offer.title, "Red Shoes");
        assert_eq!(offer.price, "19.99");
        assert_eq!(offer.currency, "USD");
        assert_eq!(offer.image_url, "https://img.example.com/1.png");
        assert_eq!(offer.description, "  Bright red  ");
        assert_eq!(offer.merchant_url, "https://shop.example.com/1");
    }

    #[test]
    fn test_from_product_without_price() {
        let product = Product {
            id: "sku2".to_string(),
            ..Product::default()
        };
        let offer = Offer::from(product);
        assert!(offer.price.is_empty());
        assert!(offer.currency.is_empty());
    }

    #[test]
    fn test_description_contains_ignores_case() {
        let offer = Offer::new("a").with_description("Waterproof Hiking Boots");
        assert!(offer.description_contains("hiking"));
        assert!(offer.description_contains("BOOTS"));
        assert!(!offer.description_contains("sandals"));
    }

    #[test]
    fn test_display() {
        let offer = Offer::new("a").with_title("Boots").with_price("10", "EUR");
        assert_eq!(offer.to_string(), "Boots (a) - 10 EUR");
        assert_eq!(Offer::new("b").with_title("Hat").to_string(), "Hat (b)");
    }
}
