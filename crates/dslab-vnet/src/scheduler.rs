//! Progress of transmissions inside a channel.

use serde::Serialize;

/// Unique transmission id.
pub type TransmissionId = u64;

const EPSILON: f64 = 1e-9;

/// Amount of data sent over a channel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transmission {
    pub id: TransmissionId,
    /// Data size in bytes.
    pub size: f64,
    /// Time when the transmission was added to the channel.
    pub start_time: f64,
}

/// Divides the channel bandwidth among transmissions which are currently inside the channel.
///
/// The channel only decides which bandwidth it is entitled to and passes it via [`Self::set_bandwidth`],
/// always calling [`Self::update_packet_processing`] first so that the progress made with the previous
/// bandwidth is accounted.
pub trait TransmissionScheduler {
    /// Sets the bandwidth available to the channel.
    fn set_bandwidth(&mut self, bandwidth: f64);

    /// Adds a new transmission at the given time.
    fn add_transmission(&mut self, transmission: Transmission, time: f64);

    /// Removes an active transmission, returns it if it was found.
    fn remove_transmission(&mut self, id: TransmissionId, time: f64) -> Option<Transmission>;

    /// Advances all active transmissions to the given time and returns the number of bytes processed
    /// since the previous call.
    fn update_packet_processing(&mut self, time: f64) -> f64;

    /// Returns the time when the next active transmission completes, or infinity.
    fn next_finish_time(&self) -> f64;

    fn active_count(&self) -> usize;

    /// Returns transmissions completed since the last [`Self::reset_completed`].
    fn completed(&self) -> &[Transmission];

    /// Returns transmissions timed out since the last [`Self::reset_timed_out`].
    fn timed_out(&self) -> &[Transmission];

    fn reset_completed(&mut self);

    fn reset_timed_out(&mut self);

    /// Sets the duration after which an unfinished transmission is reported as timed out.
    fn set_timeout(&mut self, timeout: f64);
}

struct ActiveTransmission {
    transmission: Transmission,
    remaining: f64,
}

/// Scheduler sharing the channel bandwidth equally among all active transmissions.
pub struct FairShareScheduler {
    active: Vec<ActiveTransmission>,
    completed: Vec<Transmission>,
    timed_out: Vec<Transmission>,
    bandwidth: f64,
    timeout: f64,
    last_update: f64,
}

impl Default for FairShareScheduler {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            completed: Vec::new(),
            timed_out: Vec::new(),
            bandwidth: 0.,
            timeout: f64::INFINITY,
            last_update: 0.,
        }
    }
}

impl FairShareScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn throughput_per_transmission(&self) -> f64 {
        self.bandwidth / self.active.len() as f64
    }

    /// Moves finished transmissions to the completed list.
    fn collect_completed(&mut self) {
        let mut i = 0;
        while i < self.active.len() {
            if self.active[i].remaining <= EPSILON {
                let finished = self.active.remove(i);
                self.completed.push(finished.transmission);
            } else {
                i += 1;
            }
        }
    }

    fn collect_timed_out(&mut self, time: f64) {
        let timeout = self.timeout;
        let mut i = 0;
        while i < self.active.len() {
            if time - self.active[i].transmission.start_time > timeout {
                let expired = self.active.remove(i);
                self.timed_out.push(expired.transmission);
            } else {
                i += 1;
            }
        }
    }
}

impl TransmissionScheduler for FairShareScheduler {
    fn set_bandwidth(&mut self, bandwidth: f64) {
        self.bandwidth = bandwidth;
    }

    fn add_transmission(&mut self, transmission: Transmission, time: f64) {
        if self.active.is_empty() {
            self.last_update = self.last_update.max(time);
        }
        let remaining = transmission.size;
        self.active.push(ActiveTransmission {
            transmission,
            remaining,
        });
        self.collect_completed();
    }

    fn remove_transmission(&mut self, id: TransmissionId, _time: f64) -> Option<Transmission> {
        let pos = self.active.iter().position(|a| a.transmission.id == id)?;
        Some(self.active.remove(pos).transmission)
    }

    fn update_packet_processing(&mut self, time: f64) -> f64 {
        let mut elapsed = time - self.last_update;
        self.last_update = time;
        let mut processed = 0.;
        while elapsed > 0. && !self.active.is_empty() && self.bandwidth > 0. {
            let per_transmission = self.throughput_per_transmission();
            let min_remaining = self
                .active
                .iter()
                .map(|a| a.remaining)
                .fold(f64::INFINITY, f64::min);
            let step = (min_remaining / per_transmission).min(elapsed);
            let amount = per_transmission * step;
            for a in self.active.iter_mut() {
                a.remaining -= amount;
            }
            processed += amount * self.active.len() as f64;
            elapsed -= step;
            self.collect_completed();
        }
        self.collect_timed_out(time);
        processed
    }

    fn next_finish_time(&self) -> f64 {
        if self.active.is_empty() || self.bandwidth <= 0. {
            return f64::INFINITY;
        }
        let min_remaining = self
            .active
            .iter()
            .map(|a| a.remaining)
            .fold(f64::INFINITY, f64::min);
        self.last_update + min_remaining / self.throughput_per_transmission()
    }

    fn active_count(&self) -> usize {
        self.active.len()
    }

    fn completed(&self) -> &[Transmission] {
        &self.completed
    }

    fn timed_out(&self) -> &[Transmission] {
        &self.timed_out
    }

    fn reset_completed(&mut self) {
        self.completed.clear();
    }

    fn reset_timed_out(&mut self) {
        self.timed_out.clear();
    }

    fn set_timeout(&mut self, timeout: f64) {
        self.timeout = timeout;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_float_eq(x: f64, y: f64, eps: f64) {
        assert!((x - y).abs() < eps, "Values do not match: {:.15} vs {:.15}", x, y);
    }

    fn transmission(id: TransmissionId, size: f64, start_time: f64) -> Transmission {
        Transmission { id, size, start_time }
    }

    #[test]
    fn bandwidth_is_shared_equally() {
        let mut scheduler = FairShareScheduler::new();
        scheduler.set_bandwidth(100.);
        scheduler.add_transmission(transmission(1, 100., 0.), 0.);
        scheduler.add_transmission(transmission(2, 300., 0.), 0.);
        // both at 50/s, the first one finishes at t=2
        assert_float_eq(scheduler.next_finish_time(), 2., 1e-12);
        let processed = scheduler.update_packet_processing(3.);
        assert_float_eq(processed, 300., 1e-9);
        assert_eq!(scheduler.completed().len(), 1);
        assert_eq!(scheduler.completed()[0].id, 1);
        // second one has 300 - 100 - 100 = 100 left at full rate
        assert_float_eq(scheduler.next_finish_time(), 4., 1e-9);
        scheduler.reset_completed();
        assert!(scheduler.completed().is_empty());
    }

    #[test]
    fn bandwidth_change_after_flush() {
        let mut scheduler = FairShareScheduler::new();
        scheduler.set_bandwidth(10.);
        scheduler.add_transmission(transmission(1, 100., 0.), 0.);
        assert_float_eq(scheduler.update_packet_processing(5.), 50., 1e-9);
        scheduler.set_bandwidth(50.);
        assert_float_eq(scheduler.next_finish_time(), 6., 1e-9);
        assert_float_eq(scheduler.update_packet_processing(10.), 50., 1e-9);
        assert_eq!(scheduler.completed().len(), 1);
        assert_eq!(scheduler.next_finish_time(), f64::INFINITY);
    }

    #[test]
    fn unfinished_transmissions_time_out() {
        let mut scheduler = FairShareScheduler::new();
        scheduler.set_bandwidth(1.);
        scheduler.set_timeout(5.);
        scheduler.add_transmission(transmission(1, 100., 0.), 0.);
        scheduler.update_packet_processing(4.);
        assert!(scheduler.timed_out().is_empty());
        scheduler.update_packet_processing(6.);
        assert_eq!(scheduler.timed_out().len(), 1);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn remove_active_transmission() {
        let mut scheduler = FairShareScheduler::new();
        scheduler.set_bandwidth(1.);
        scheduler.add_transmission(transmission(1, 100., 0.), 0.);
        assert_eq!(scheduler.remove_transmission(1, 1.).map(|t| t.id), Some(1));
        assert_eq!(scheduler.remove_transmission(1, 1.), None);
    }
}
