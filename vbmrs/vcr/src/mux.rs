//! Maps irregular controller polling onto one sample per controller per frame.
//!
//! Some games (Super Game Boy titles in particular) don't poll every controller
//! every frame, and may poll one controller again before the others. The movie
//! still stores exactly one sample per recorded controller per frame, so when a
//! controller is polled twice in a round the controllers that were skipped get
//! a synthesized sample first.

use vbmrs_movie::{ControllerFlags, MAX_CONTROLLERS};

/// One controller sample to produce or consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub port: usize,
    /// The game didn't poll this controller; the sample only fills the gap.
    pub synthesized: bool,
}

#[derive(Debug, Clone)]
pub struct Multiplexer {
    controllers: ControllerFlags,
    pending: ControllerFlags,
}

impl Multiplexer {
    pub fn new(controllers: ControllerFlags) -> Self {
        let controllers = controllers & ControllerFlags::ANY;
        Self {
            controllers,
            pending: controllers,
        }
    }

    /// Controllers not yet sampled in the current round.
    pub fn pending(&self) -> ControllerFlags {
        self.pending
    }

    /// Starts a new round, e.g. after the cursor moved to a frame boundary.
    pub fn restart_round(&mut self) {
        self.pending = self.controllers;
    }

    /// Registers a poll of `port` and returns the samples to handle for it, in order.
    ///
    /// After a repeated poll the polled controller counts toward the new round.
    /// VBA-rr did not count it, so old movies that repeatedly poll a single
    /// controller replay with a different slot alignment.
    pub fn poll(&mut self, port: usize) -> PollPlan {
        let flag = ControllerFlags::port(port).unwrap_or(ControllerFlags::empty());

        let fills = if !self.pending.contains(flag) {
            // repeated poll: close the round with blanks for whoever was skipped
            let fills = self.pending;
            self.pending = self.controllers;
            fills
        } else {
            ControllerFlags::empty()
        };

        self.pending.remove(flag);
        if self.pending.is_empty() {
            self.pending = self.controllers;
        }

        PollPlan {
            fills,
            next_fill: 0,
            port: Some(port),
        }
    }
}

/// Iterator over the samples for one poll: synthesized ones first, ascending by port.
#[derive(Debug, Clone)]
pub struct PollPlan {
    fills: ControllerFlags,
    next_fill: usize,
    port: Option<usize>,
}

impl Iterator for PollPlan {
    type Item = Slot;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_fill < MAX_CONTROLLERS {
            let port = self.next_fill;
            self.next_fill += 1;
            if self.fills.port_present(port) {
                return Some(Slot {
                    port,
                    synthesized: true,
                });
            }
        }
        self.port.take().map(|port| Slot {
            port,
            synthesized: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(bits: u8) -> ControllerFlags {
        ControllerFlags::from_bits_retain(bits)
    }

    fn ports(plan: PollPlan) -> Vec<(usize, bool)> {
        plan.map(|slot| (slot.port, slot.synthesized)).collect()
    }

    #[test]
    fn test_regular_polling() {
        let mut mux = Multiplexer::new(flags(0b0011));
        for _ in 0..3 {
            assert_eq!(ports(mux.poll(0)), [(0, false)]);
            assert_eq!(ports(mux.poll(1)), [(1, false)]);
            assert_eq!(mux.pending(), flags(0b0011));
        }
    }

    #[test]
    fn test_single_controller() {
        let mut mux = Multiplexer::new(flags(0b0001));
        for _ in 0..5 {
            assert_eq!(ports(mux.poll(0)), [(0, false)]);
        }
    }

    #[test]
    fn test_repeat_poll_fills_skipped() {
        let mut mux = Multiplexer::new(flags(0b0111));
        assert_eq!(ports(mux.poll(0)), [(0, false)]);
        assert_eq!(
            ports(mux.poll(0)),
            [(1, true), (2, true), (0, false)]
        );
        // the second poll of 0 opened a new round
        assert_eq!(mux.pending(), flags(0b0110));
        assert_eq!(ports(mux.poll(2)), [(2, false)]);
        assert_eq!(ports(mux.poll(1)), [(1, false)]);
        assert_eq!(mux.pending(), flags(0b0111));
    }

    #[test]
    fn test_rounds_stay_aligned() {
        // every completed round holds one sample per controller
        let mut mux = Multiplexer::new(flags(0b1011));
        let polls = [0, 1, 3, 1, 1, 0, 3, 3, 3, 1, 0, 0, 1, 3];
        let mut stream = Vec::new();
        for port in polls {
            stream.extend(mux.poll(port).map(|slot| slot.port));
        }
        let complete = stream.len() - stream.len() % 3;
        for round in stream[..complete].chunks(3) {
            let mut sorted = round.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, [0, 1, 3], "stream {:?}", stream);
        }
    }

    #[test]
    fn test_skipped_get_exactly_one_fill() {
        let mut mux = Multiplexer::new(flags(0b1111));
        mux.poll(1);
        let plan = ports(mux.poll(1));
        assert_eq!(plan, [(0, true), (2, true), (3, true), (1, false)]);
    }
}
