use serde::{Deserialize, Serialize};

use crate::{Machine, MachineKind, MachineStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub available: u32,
    pub in_use: u32,
    pub out_of_order: u32,
}

/// Per-kind tally of cached machine statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub washer: StatusCounts,
    pub dryer: StatusCounts,
}

impl StatusCounts {
    fn record(&mut self, status: MachineStatus) {
        match status {
            MachineStatus::Available => self.available += 1,
            MachineStatus::Booked => self.in_use += 1,
            MachineStatus::OutOfOrder => self.out_of_order += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.available + self.in_use + self.out_of_order
    }
}

impl Availability {
    pub fn tally<'a>(machines: impl IntoIterator<Item = &'a Machine>) -> Self {
        let mut availability = Self::default();
        for machine in machines {
            let counts = match machine.kind {
                MachineKind::Washer => &mut availability.washer,
                MachineKind::Dryer => &mut availability.dryer,
            };
            counts.record(machine.status);
        }
        availability
    }

    pub fn total(&self) -> u32 {
        self.washer.total() + self.dryer.total()
    }
}
