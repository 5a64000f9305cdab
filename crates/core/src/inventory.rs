//! Medication inventory and low-stock notification.
//!
//! Independent of scheduling: inventory mutations flow straight into the
//! store and, when stock drops below the threshold, out through the
//! [`Notify`](crate::persist::Notify) collaborator. The check runs on every
//! mutation, so repeated low-quantity updates emit repeated notifications;
//! de-duplication is deliberately absent.

use crate::constants::LOW_STOCK_THRESHOLD;
use crate::models::InventoryItem;
use crate::persist::EntityKind;
use crate::store::DirectoryStore;
use crate::validation::require_non_empty;
use crate::{ClinicError, ClinicResult};

impl DirectoryStore {
    /// Sets an item's stocked quantity, creating the item on first
    /// reference.
    ///
    /// If the resulting quantity is below the low-stock threshold, a
    /// templated warning is delivered through the notification collaborator.
    /// The stock level itself stays committed even if delivery fails; the
    /// failure is still reported to the caller.
    ///
    /// # Errors
    ///
    /// - `Validation` if the item name is empty or the quantity is negative.
    /// - `Persistence` if the durable mirror fails (quantity rolled back) or
    ///   if notification delivery fails (quantity kept).
    pub fn set_inventory_quantity(
        &self,
        item_name: &str,
        quantity: i64,
    ) -> ClinicResult<InventoryItem> {
        require_non_empty("itemName", item_name)?;
        if quantity < 0 {
            return Err(ClinicError::Validation(
                "quantity cannot be negative".into(),
            ));
        }

        let mut registry = self.write_registry();
        let existing = registry
            .inventory
            .iter()
            .position(|item| item.item_name == item_name);

        let item = InventoryItem {
            item_name: item_name.to_owned(),
            quantity,
        };

        let previous = match existing {
            Some(index) => {
                Some(std::mem::replace(&mut registry.inventory[index], item.clone()))
            }
            None => {
                registry.inventory.push(item.clone());
                None
            }
        };

        if let Err(err) = self.mirror(EntityKind::Inventory, &item) {
            match (existing, previous) {
                (Some(index), Some(old)) => registry.inventory[index] = old,
                _ => {
                    registry.inventory.pop();
                }
            }
            return Err(err.into());
        }

        if quantity < LOW_STOCK_THRESHOLD {
            let message = format!(
                "Low stock warning: {item_name} has only {quantity} items left. Please add stock"
            );
            tracing::warn!(item_name, quantity, "inventory below threshold");
            self.notify_collaborator().notify(item_name, &message)?;
        }

        tracing::info!(item_name, quantity, "inventory updated");
        Ok(item)
    }
}
