use crate::ids::UserId;
use crate::types::{Contract, ContractStatus};
use serde::Serialize;

/// Confirmation progress of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "confirmed_by", rename_all = "snake_case")]
pub enum ConfirmationState {
    Unsigned,
    PartiallyConfirmed(UserId),
    FullySigned,
}

impl ConfirmationState {
    pub fn of(contract: &Contract) -> Self {
        let confirmed: Vec<&UserId> = contract
            .parties()
            .into_iter()
            .filter(|party| contract.has_confirmed(party))
            .collect();

        match confirmed.as_slice() {
            [] => Self::Unsigned,
            [single] => Self::PartiallyConfirmed((*single).clone()),
            _ => Self::FullySigned,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unsigned => "unsigned",
            Self::PartiallyConfirmed(_) => "partially_confirmed",
            Self::FullySigned => "fully_signed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FullySigned)
    }
}

/// Why a confirmation cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationRejection {
    NotAParty,
    AlreadyConfirmed,
}

/// Result of applying one confirmation to a contract snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationTransition {
    pub from: ConfirmationState,
    pub to: ConfirmationState,
    pub both_accepted: bool,
    pub contract: Contract,
}

/// Apply `user`'s confirmation to `contract` without touching storage.
///
/// Party membership is checked before duplicate confirmation, so a non-party
/// is always rejected as such regardless of contract state. The terminal
/// status is written only on the transition into `FullySigned`; `version`
/// and timestamps are left for the store to advance.
pub fn apply_confirmation(
    contract: &Contract,
    user: &UserId,
    terminal_status: ContractStatus,
) -> Result<ConfirmationTransition, ConfirmationRejection> {
    if !contract.is_party(user) {
        return Err(ConfirmationRejection::NotAParty);
    }
    if contract.has_confirmed(user) {
        return Err(ConfirmationRejection::AlreadyConfirmed);
    }

    let from = ConfirmationState::of(contract);

    let mut next = contract.clone();
    next.users_confirm.retain(|confirmed| contract.is_party(confirmed));
    dedup_in_order(&mut next.users_confirm);
    next.users_confirm.push(user.clone());

    let both_accepted = next.both_confirmed();
    if both_accepted {
        next.status = terminal_status;
    }

    Ok(ConfirmationTransition {
        from,
        to: ConfirmationState::of(&next),
        both_accepted,
        contract: next,
    })
}

fn dedup_in_order(users: &mut Vec<UserId>) {
    let mut seen: Vec<UserId> = Vec::with_capacity(users.len());
    users.retain(|user| {
        if seen.contains(user) {
            false
        } else {
            seen.push(user.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ContractId;
    use crate::types::ProposalRef;
    use proptest::prelude::*;

    fn contract() -> Contract {
        Contract::new(
            ContractId::new("c-1"),
            UserId::new("U1"),
            UserId::new("U2"),
            ProposalRef::None,
        )
        .unwrap()
    }

    #[test]
    fn first_confirmation_is_partial() {
        let base = contract();
        let transition = apply_confirmation(&base, &UserId::new("U1"), ContractStatus::Signed).unwrap();

        assert_eq!(transition.from, ConfirmationState::Unsigned);
        assert_eq!(
            transition.to,
            ConfirmationState::PartiallyConfirmed(UserId::new("U1"))
        );
        assert!(!transition.both_accepted);
        assert_eq!(transition.contract.users_confirm, vec![UserId::new("U1")]);
        assert_eq!(transition.contract.status, base.status);
    }

    #[test]
    fn second_party_completes_with_terminal_status() {
        let first = apply_confirmation(&contract(), &UserId::new("U1"), ContractStatus::Completed)
            .unwrap()
            .contract;
        let transition =
            apply_confirmation(&first, &UserId::new("U2"), ContractStatus::Completed).unwrap();

        assert!(transition.both_accepted);
        assert_eq!(transition.to, ConfirmationState::FullySigned);
        assert_eq!(transition.contract.status, ContractStatus::Completed);
        assert_eq!(
            transition.contract.users_confirm,
            vec![UserId::new("U1"), UserId::new("U2")]
        );
    }

    #[test]
    fn duplicate_and_foreign_confirmations_are_rejected() {
        let first = apply_confirmation(&contract(), &UserId::new("U1"), ContractStatus::Signed)
            .unwrap()
            .contract;

        assert_eq!(
            apply_confirmation(&first, &UserId::new("U1"), ContractStatus::Signed).unwrap_err(),
            ConfirmationRejection::AlreadyConfirmed
        );
        assert_eq!(
            apply_confirmation(&first, &UserId::new("U3"), ContractStatus::Signed).unwrap_err(),
            ConfirmationRejection::NotAParty
        );
    }

    #[test]
    fn stored_duplicates_are_collapsed() {
        let mut base = contract();
        base.users_confirm = vec![UserId::new("U1"), UserId::new("U1")];

        assert_eq!(
            ConfirmationState::of(&base),
            ConfirmationState::PartiallyConfirmed(UserId::new("U1"))
        );
        let transition = apply_confirmation(&base, &UserId::new("U2"), ContractStatus::Signed).unwrap();
        assert_eq!(
            transition.contract.users_confirm,
            vec![UserId::new("U1"), UserId::new("U2")]
        );
    }

    fn arb_user() -> impl Strategy<Value = UserId> {
        prop_oneof![Just("U1"), Just("U2"), Just("U3"), Just("U4")].prop_map(|id| UserId::new(id))
    }

    proptest! {
        /// Any sequence of attempts keeps confirmations within the parties,
        /// never flips a completed contract back, and reports both_accepted
        /// exactly when both parties are present.
        #[test]
        fn confirmation_sequences_preserve_invariants(
            attempts in prop::collection::vec(arb_user(), 0..12),
        ) {
            let mut current = contract();
            let mut completed = false;

            for user in attempts {
                let before = current.clone();
                match apply_confirmation(&current, &user, ContractStatus::Signed) {
                    Ok(transition) => {
                        prop_assert!(!completed);
                        prop_assert_eq!(
                            transition.both_accepted,
                            transition.contract.both_confirmed()
                        );
                        current = transition.contract;
                        completed = transition.both_accepted;
                    }
                    Err(ConfirmationRejection::NotAParty) => {
                        prop_assert!(!before.is_party(&user));
                    }
                    Err(ConfirmationRejection::AlreadyConfirmed) => {
                        prop_assert!(before.has_confirmed(&user));
                    }
                }

                prop_assert!(current.users_confirm.iter().all(|u| current.is_party(u)));
                prop_assert!(current.users_confirm.len() <= 2);
                if completed {
                    prop_assert!(current.both_confirmed());
                    prop_assert_eq!(current.status, ContractStatus::Signed);
                }
            }
        }
    }
}
