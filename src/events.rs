use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{channel, Receiver, Sender};

use crate::models::{
    account::AccountStanding,
    bill::FinalBill,
    session::{ParkingSession, Settlement, SessionView},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AppEvent {
    SessionBooked {
        session: ParkingSession,
    },
    SessionExtended {
        session: ParkingSession,
    },
    SessionTick {
        view: SessionView,
    },
    SessionEnded {
        bill: FinalBill,
    },
    BillSettled {
        account_id: String,
        session_id: String,
        settlement: Settlement,
    },
    StandingChanged {
        standing: AccountStanding,
    },
}

impl AppEvent {
    pub fn account_id(&self) -> &str {
        match self {
            AppEvent::SessionBooked { session } | AppEvent::SessionExtended { session } => {
                &session.account_id
            }
            AppEvent::SessionTick { view } => &view.session.account_id,
            AppEvent::SessionEnded { bill } => &bill.account_id,
            AppEvent::BillSettled { account_id, .. } => account_id,
            AppEvent::StandingChanged { standing } => &standing.account_id,
        }
    }
}

#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Sender<AppEvent>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = channel(10000);
        Self { sender }
    }

    pub fn broadcast(&self, event: AppEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> Receiver<AppEvent> {
        self.sender.subscribe()
    }
}
