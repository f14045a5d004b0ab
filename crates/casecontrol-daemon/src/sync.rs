//! Serial synchronizer: keeps the controller showing the computed outputs.
//!
//! Every cycle the three fields (case color, LCD color, LCD text) are encoded
//! and compared with the packet last acknowledged for that field. A field is
//! sent when it differs or when it has not been sent for the refresh period.
//! Only an acknowledged packet counts as sent, so a lost ACK means the field
//! goes out again on the next cycle.

use casecontrol_hw::link::{build_color_packet, build_text_packet};
use casecontrol_hw::{Connector, DeviceLink, Result, Rgb, Tag};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::SerialConfig;
use crate::state::{Output, SharedState};
use crate::throttle::WarnThrottle;

/// Link states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Opening,
    Connected,
}

/// Synchronizer timing.
#[derive(Debug, Clone, Copy)]
pub struct SyncTiming {
    /// Pause between sync cycles
    pub cycle: Duration,
    /// Wait for each ACK
    pub ack_timeout: Duration,
    /// Resend unchanged fields this often
    pub refresh: Duration,
    /// Pause between open attempts
    pub reconnect: Duration,
    /// Quiet period after opening while the controller boots
    pub boot_delay: Duration,
}

impl From<&SerialConfig> for SyncTiming {
    fn from(config: &SerialConfig) -> Self {
        Self {
            cycle: Duration::from_millis(config.cycle),
            ack_timeout: Duration::from_millis(config.ack_timeout),
            refresh: Duration::from_millis(config.refresh),
            reconnect: Duration::from_millis(config.reconnect),
            boot_delay: Duration::from_millis(config.boot_delay),
        }
    }
}

/// What was last acknowledged for one field, and when.
#[derive(Debug, Default)]
struct FieldSync {
    last_sent: Option<Vec<u8>>,
    sent_at: Option<Instant>,
}

impl FieldSync {
    fn is_due(&self, packet: &[u8], now: Instant, refresh: Duration) -> bool {
        match (&self.last_sent, self.sent_at) {
            (Some(last), Some(at)) => {
                last.as_slice() != packet || now.saturating_duration_since(at) >= refresh
            }
            _ => true,
        }
    }

    fn mark_sent(&mut self, packet: Vec<u8>, now: Instant) {
        self.last_sent = Some(packet);
        self.sent_at = Some(now);
    }
}

/// Pushes output changes to the controller over a [`Connector`].
pub struct Synchronizer<C: Connector> {
    connector: C,
    link: Option<DeviceLink<C::Port>>,
    link_state: LinkState,
    timing: SyncTiming,
    /// No packets before this instant
    ready_at: Instant,
    /// Case color, LCD color, LCD text
    fields: [FieldSync; 3],
    /// One per field; an ACK only ends the streak of its own field
    transport_errors: [WarnThrottle; 3],
}

impl<C: Connector> Synchronizer<C> {
    pub fn new(connector: C, timing: SyncTiming) -> Self {
        Self {
            connector,
            link: None,
            link_state: LinkState::Disconnected,
            timing,
            ready_at: Instant::now(),
            fields: Default::default(),
            transport_errors: [
                WarnThrottle::new("Case color not acknowledged"),
                WarnThrottle::new("LCD color not acknowledged"),
                WarnThrottle::new("LCD text not acknowledged"),
            ],
        }
    }

    /// Returns the link state.
    pub fn link_state(&self) -> LinkState {
        self.link_state
    }

    /// Returns the timing in use.
    pub fn timing(&self) -> &SyncTiming {
        &self.timing
    }

    /// Tries once to open the link.
    ///
    /// Opening resets the controller, so every field is treated as unsent and
    /// nothing is written until the boot delay has passed.
    pub async fn connect(&mut self) -> Result<()> {
        self.link_state = LinkState::Opening;
        match self.connector.connect().await {
            Ok(port) => {
                info!("Connected to controller on {}", self.connector.name());
                self.link = Some(DeviceLink::new(port, self.timing.ack_timeout));
                self.fields = Default::default();
                self.ready_at = Instant::now() + self.timing.boot_delay;
                self.link_state = LinkState::Connected;
                Ok(())
            }
            Err(e) => {
                self.link_state = LinkState::Disconnected;
                Err(e)
            }
        }
    }

    fn disconnect(&mut self) {
        self.link = None;
        self.fields = Default::default();
        self.link_state = LinkState::Disconnected;
    }

    /// Sends every field that changed or is due for refresh. Returns the
    /// number of packets written.
    ///
    /// ACK timeouts and mismatches are logged and left for the next cycle.
    /// An I/O error drops the link and is returned.
    pub async fn sync_once(&mut self, output: &Output, now: Instant) -> Result<usize> {
        if now < self.ready_at {
            return Ok(0);
        }
        let Some(link) = self.link.as_mut() else {
            return Ok(0);
        };

        let packets = [
            build_color_packet(Tag::CaseColor, output.case_color).to_vec(),
            build_color_packet(Tag::LcdColor, output.lcd_color).to_vec(),
            build_text_packet(&output.lcd_text).to_vec(),
        ];

        let mut written = 0;
        let mut lost = None;
        let fields = self.fields.iter_mut().zip(self.transport_errors.iter_mut());
        for ((field, errors), packet) in fields.zip(packets) {
            if !field.is_due(&packet, now, self.timing.refresh) {
                continue;
            }
            written += 1;
            match link.send(&packet).await {
                Ok(()) => {
                    field.mark_sent(packet, now);
                    errors.success();
                }
                Err(e) if e.is_link_lost() => {
                    lost = Some(e);
                    break;
                }
                Err(e) => {
                    errors.failure(&e);
                }
            }
        }

        if let Some(e) = lost {
            self.disconnect();
            return Err(e);
        }
        Ok(written)
    }

    /// Turns the case lights and the LCD backlight off and closes the link.
    ///
    /// Best effort: failures are only logged.
    pub async fn shutdown(&mut self) {
        if let Some(link) = self.link.as_mut() {
            for tag in [Tag::CaseColor, Tag::LcdColor] {
                if let Err(e) = link.send(&build_color_packet(tag, Rgb::BLACK)).await {
                    debug!("Lights off failed for {}: {}", tag, e);
                    if e.is_link_lost() {
                        break;
                    }
                }
            }
            info!("Controller link closed");
        }
        self.disconnect();
    }
}

/// Waits for `period` or until shutdown is requested. Returns true on shutdown.
async fn wait_or_shutdown(period: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(period) => *shutdown.borrow(),
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

/// Runs the synchronizer until shutdown, then turns the lights off.
pub async fn sync_loop<C: Connector>(
    mut sync: Synchronizer<C>,
    state: Arc<SharedState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut connect_errors = WarnThrottle::new("Controller unavailable");
    let timing = *sync.timing();

    loop {
        if *shutdown.borrow() {
            break;
        }

        let pause = match sync.link_state() {
            LinkState::Connected => {
                // Copy out so the lock is not held while waiting on ACKs
                let output = state.output();
                if let Err(e) = sync.sync_once(&output, Instant::now()).await {
                    connect_errors.failure(&e);
                    timing.reconnect
                } else {
                    timing.cycle
                }
            }
            LinkState::Disconnected | LinkState::Opening => match sync.connect().await {
                Ok(()) => {
                    connect_errors.success();
                    Duration::ZERO
                }
                Err(e) => {
                    connect_errors.failure(&e);
                    timing.reconnect
                }
            },
        };

        if wait_or_shutdown(pause, &mut shutdown).await {
            break;
        }
    }

    sync.shutdown().await;
    debug!("Synchronizer stopped");
}
