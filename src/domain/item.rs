use super::money::{Currency, Price};
use crate::error::{Result, ShopError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A purchasable catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub currency: Currency,
}

impl Item {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Decimal,
        currency: Currency,
    ) -> Result<Self> {
        Ok(Self {
            id: ItemId(id),
            name: name.into(),
            description: description.into(),
            price: Price::new(price)?,
            currency,
        })
    }
}

/// A non-empty, ordered selection of items to check out together.
///
/// A single-item purchase is just a basket of one.
#[derive(Debug, Clone, PartialEq)]
pub struct Basket {
    items: Vec<Item>,
}

impl Basket {
    pub fn new(items: Vec<Item>) -> Result<Self> {
        if items.is_empty() {
            return Err(ShopError::ValidationError(
                "Select items for your order".to_string(),
            ));
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the shared currency when every item is priced in the same one.
    pub fn single_currency(&self) -> Option<Currency> {
        let (first, rest) = self.items.split_first()?;
        rest.iter()
            .all(|item| item.currency == first.currency)
            .then_some(first.currency)
    }
}

impl From<Item> for Basket {
    fn from(item: Item) -> Self {
        Self { items: vec![item] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_item_rejects_negative_price() {
        let result = Item::new(1, "Mug", "Ceramic", dec!(-1), Currency::Usd);
        assert!(matches!(result, Err(ShopError::ValidationError(_))));
    }

    #[test]
    fn test_empty_basket_rejected() {
        assert!(matches!(
            Basket::new(vec![]),
            Err(ShopError::ValidationError(_))
        ));
    }

    #[test]
    fn test_single_currency() {
        let mug = Item::new(1, "Mug", "", dec!(10), Currency::Usd).unwrap();
        let cap = Item::new(2, "Cap", "", dec!(5), Currency::Usd).unwrap();
        let tea = Item::new(3, "Tea", "", dec!(300), Currency::Rub).unwrap();

        let same = Basket::new(vec![mug.clone(), cap]).unwrap();
        assert_eq!(same.single_currency(), Some(Currency::Usd));

        let mixed = Basket::new(vec![mug, tea]).unwrap();
        assert_eq!(mixed.single_currency(), None);
    }

    #[test]
    fn test_item_deserialization_from_csv() {
        let data = "id,name,description,price,currency\n7,Mug,Ceramic mug,12.50,eur";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let item: Item = reader
            .deserialize()
            .next()
            .unwrap()
            .expect("Failed to deserialize item");

        assert_eq!(item.id, ItemId(7));
        assert_eq!(item.price.value(), dec!(12.5));
        assert_eq!(item.currency, Currency::Eur);
    }
}
