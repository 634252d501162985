//! Auto-renewal toggle.

use deposit_service::events::{AutoRenewalToggled, ChannelNames};
use deposit_service::outbox::OutboxStoreExt;
use deposit_service::saga::AutoRenewalToggle;
use uuid::Uuid;

use super::support;

#[test]
fn toggle_persists_flag_and_notifies_bank() {
    let fx = support::fixture("0", "1000");
    let toggle = AutoRenewalToggle::new(fx.ledger.clone(), ChannelNames::default());

    let agreement = toggle.toggle(fx.client_id, fx.agreement.id, true).unwrap();

    assert!(agreement.auto_renewal);
    assert!(fx.ledger.agreement(fx.agreement.id).unwrap().auto_renewal);
    let messages = fx.ledger.store().outbox_messages().unwrap();
    assert_eq!(messages[0].channel, ChannelNames::default().auto_renewal);
    let toggled: AutoRenewalToggled = serde_json::from_str(&messages[0].payload).unwrap();
    assert_eq!(
        toggled,
        AutoRenewalToggled {
            agreement_id: fx.agreement.id,
            auto_renewal: true,
        }
    );
}

#[test]
fn other_clients_agreement_is_not_found() {
    let fx = support::fixture("0", "1000");
    let toggle = AutoRenewalToggle::new(fx.ledger.clone(), ChannelNames::default());

    let err = toggle
        .toggle(Uuid::new_v4(), fx.agreement.id, true)
        .unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert!(!fx.ledger.agreement(fx.agreement.id).unwrap().auto_renewal);
}

#[test]
fn inactive_agreement_is_not_found() {
    let fx = support::fixture("0", "1000");
    fx.ledger
        .transaction(|tx| {
            let mut agreement = tx.agreement_for_update(fx.agreement.id)?;
            agreement.data.is_active = false;
            tx.put_agreement(agreement)
        })
        .unwrap();
    let toggle = AutoRenewalToggle::new(fx.ledger.clone(), ChannelNames::default());

    let err = toggle.toggle(fx.client_id, fx.agreement.id, true).unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert!(fx.ledger.store().outbox_messages().unwrap().is_empty());
}
