//! Trading component for merchant NPCs
//!
//! Prices scale with the merchant's disposition toward the buyer: at +100 the
//! player buys at 75% of base and sells at 125%; at -100 the spread inverts.

use serde::{Deserialize, Serialize};

use crate::entities::item::ItemInstance;

/// Maximum price swing from disposition, as a fraction of base price
const DISPOSITION_PRICE_SWING: f64 = 0.25;

/// Stock and pricing for a merchant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingComponent {
    stock: Vec<ItemInstance>,
    gold: i64,
    /// Multiplier applied to base value when the merchant sells to the player
    pub sell_markup: f64,
    /// Multiplier applied to base value when the merchant buys from the player
    pub buy_markdown: f64,
}

impl TradingComponent {
    pub fn new(gold: i64) -> Self {
        Self {
            stock: Vec::new(),
            gold,
            sell_markup: 1.2,
            buy_markdown: 0.6,
        }
    }

    pub fn stock(&self) -> &[ItemInstance] {
        &self.stock
    }

    pub fn gold(&self) -> i64 {
        self.gold
    }

    pub fn with_stock(mut self, instance: ItemInstance) -> Self {
        self.stock.push(instance);
        self
    }

    pub fn add_stock(&mut self, instance: ItemInstance) {
        self.stock.push(instance);
    }

    pub fn take_stock(&mut self, id: crate::ItemInstanceId) -> Option<ItemInstance> {
        let index = self.stock.iter().position(|i| i.id == id)?;
        Some(self.stock.remove(index))
    }

    pub fn add_gold(&mut self, amount: i64) {
        self.gold += amount.max(0);
    }

    pub fn spend_gold(&mut self, amount: i64) -> bool {
        if self.gold < amount {
            return false;
        }
        self.gold -= amount;
        true
    }

    /// Disposition modifier in [1 - swing, 1 + swing]; friendlier = cheaper
    fn disposition_factor(disposition: i32) -> f64 {
        1.0 - DISPOSITION_PRICE_SWING * f64::from(disposition.clamp(-100, 100)) / 100.0
    }

    /// Price the player pays to buy `base_value` goods from this merchant
    pub fn price_to_player(&self, base_value: i64, disposition: i32) -> i64 {
        let price = base_value as f64 * self.sell_markup * Self::disposition_factor(disposition);
        (price.round() as i64).max(1)
    }

    /// Gold the merchant pays the player for `base_value` goods
    pub fn price_from_player(&self, base_value: i64, disposition: i32) -> i64 {
        // Inverse factor: a friendly merchant pays more
        let factor = 2.0 - Self::disposition_factor(disposition);
        let price = base_value as f64 * self.buy_markdown * factor;
        (price.round() as i64).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendly_merchant_sells_cheaper() {
        let trading = TradingComponent::new(500);
        let neutral = trading.price_to_player(100, 0);
        let friendly = trading.price_to_player(100, 100);
        let hostile = trading.price_to_player(100, -100);
        assert!(friendly < neutral);
        assert!(hostile > neutral);
        // 100 * 1.2 * 0.75 = 90
        assert_eq!(friendly, 90);
        assert_eq!(hostile, 150);
    }

    #[test]
    fn test_friendly_merchant_buys_dearer() {
        let trading = TradingComponent::new(500);
        let neutral = trading.price_from_player(100, 0);
        let friendly = trading.price_from_player(100, 100);
        assert!(friendly > neutral);
    }

    #[test]
    fn test_price_floor() {
        let trading = TradingComponent::new(0);
        assert_eq!(trading.price_to_player(0, 0), 1);
    }

    #[test]
    fn test_stock_movement() {
        let sword = ItemInstance::new("iron_sword", 5);
        let id = sword.id;
        let mut trading = TradingComponent::new(100).with_stock(sword);
        assert_eq!(trading.stock().len(), 1);
        assert!(trading.take_stock(id).is_some());
        assert!(trading.take_stock(id).is_none());
    }
}
