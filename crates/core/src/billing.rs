//! Bill mutation and the insurance claim state machine.
//!
//! A bill's claim advances strictly forward: `NotSubmitted` -> `Pending` ->
//! `Approved` or `Denied`. Fee updates and claim transitions follow the same
//! commit discipline as every other mutation: mutate under the write lock,
//! mirror to durable storage, restore the previous bill on failure.

use crate::models::{Bill, ClaimStatus};
use crate::persist::EntityKind;
use crate::store::DirectoryStore;
use crate::{ClinicError, ClinicResult};

impl DirectoryStore {
    /// Updates a bill's fees. Omitted fees keep their previous value;
    /// `total_fee` is recomputed as the exact sum of the three components.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the bill id is unknown.
    /// - `Persistence` if the durable mirror fails; the previous fees are
    ///   restored.
    pub fn update_fees(
        &self,
        bill_id: i64,
        medication_fee: Option<f64>,
        consultation_fee: Option<f64>,
        surgery_fee: Option<f64>,
    ) -> ClinicResult<Bill> {
        self.mutate_bill(bill_id, |bill| {
            if let Some(fee) = medication_fee {
                bill.medication_fee = fee;
            }
            if let Some(fee) = consultation_fee {
                bill.consultation_fee = fee;
            }
            if let Some(fee) = surgery_fee {
                bill.surgery_fee = fee;
            }
            bill.recompute_total();
            Ok(())
        })
    }

    /// Submits the bill's insurance claim, moving it to `Pending`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the bill id is unknown.
    /// - `InvalidState` if the bill is not insured, or already claimed.
    /// - `Persistence` on a failed durable mirror; the claim stays
    ///   unsubmitted.
    pub fn submit_claim(&self, bill_id: i64) -> ClinicResult<Bill> {
        let bill = self.mutate_bill(bill_id, |bill| {
            if !bill.is_insured {
                return Err(ClinicError::InvalidState(format!(
                    "bill {bill_id} is not for an insured patient"
                )));
            }
            if bill.claimed {
                return Err(ClinicError::InvalidState(format!(
                    "bill {bill_id} has already been claimed"
                )));
            }
            bill.claimed = true;
            bill.claim_status = ClaimStatus::Pending;
            Ok(())
        })?;

        tracing::info!(bill_id, "insurance claim submitted");
        Ok(bill)
    }

    /// Approves a pending claim. Terminal; no further transitions apply.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the bill id is unknown.
    /// - `InvalidState` unless the claim is `Pending`.
    /// - `Persistence` on a failed durable mirror; the claim stays pending.
    pub fn approve_claim(&self, bill_id: i64) -> ClinicResult<Bill> {
        self.settle_claim(bill_id, ClaimStatus::Approved)
    }

    /// Denies a pending claim. Terminal; no further transitions apply.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DirectoryStore::approve_claim`].
    pub fn deny_claim(&self, bill_id: i64) -> ClinicResult<Bill> {
        self.settle_claim(bill_id, ClaimStatus::Denied)
    }

    fn settle_claim(&self, bill_id: i64, outcome: ClaimStatus) -> ClinicResult<Bill> {
        debug_assert!(outcome.is_terminal());

        let bill = self.mutate_bill(bill_id, |bill| {
            if bill.claim_status != ClaimStatus::Pending {
                return Err(ClinicError::InvalidState(format!(
                    "claim on bill {bill_id} is {}, not Pending",
                    bill.claim_status
                )));
            }
            bill.claim_status = outcome;
            Ok(())
        })?;

        tracing::info!(bill_id, %outcome, "insurance claim settled");
        Ok(bill)
    }

    /// Applies a checked mutation to one bill under the write lock, mirrors
    /// the result, and restores the previous bill if the mirror fails.
    fn mutate_bill(
        &self,
        bill_id: i64,
        apply: impl FnOnce(&mut Bill) -> ClinicResult<()>,
    ) -> ClinicResult<Bill> {
        let mut registry = self.write_registry();
        let Some(index) = registry.bill_index(bill_id) else {
            return Err(ClinicError::not_found("bill", bill_id));
        };

        let previous = registry.bills[index].clone();
        apply(&mut registry.bills[index])?;

        let updated = registry.bills[index].clone();
        if let Err(err) = self.mirror(EntityKind::Bill, &updated) {
            registry.bills[index] = previous;
            return Err(err.into());
        }

        Ok(updated)
    }
}
