use std::sync::Arc;

use deposit_service::domain::CardStatus;
use deposit_service::events::ChannelNames;
use deposit_service::saga::{check_transition, CardStatusMachine};
use deposit_service::DepositError;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::{card, ledger_with_account};

fn status() -> impl Strategy<Value = CardStatus> {
    prop::sample::select(CardStatus::ALL.to_vec())
}

proptest! {
    #[test]
    fn transition_is_refused_only_when_status_is_unchanged(from in status(), to in status()) {
        let mut subject = card(uuid::Uuid::new_v4(), "4000000000000001", Decimal::ZERO, true);
        subject.status = from;

        let result = check_transition(&subject, to);
        if from == to {
            let duplicate = matches!(result, Err(DepositError::DuplicateStatus { .. }));
            prop_assert!(duplicate);
        } else {
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn stored_status_follows_accepted_transitions(path in prop::collection::vec(status(), 1..12)) {
        let (ledger, account) = ledger_with_account();
        let ledger = Arc::new(ledger);
        let issued = ledger
            .add_card(card(account.id, "4000000000000001", Decimal::ZERO, true))
            .unwrap();
        let machine = CardStatusMachine::new(ledger.clone(), ChannelNames::default());

        let mut expected = CardStatus::Active;
        for next in path {
            let result = machine.modify_status(issued.id, next);
            if next == expected {
                prop_assert!(result.is_err());
            } else {
                prop_assert_eq!(result.unwrap().status, next);
                expected = next;
            }
            prop_assert_eq!(ledger.card(issued.id).unwrap().status, expected);
        }
    }
}
