//! nusb-backed bulk transport
//!
//! nusb transfers are futures; a small current-thread runtime drives them so
//! the session can stay synchronous. Reads are bounded by the poll timeout
//! and report "no data" when it expires, leaving the overall read deadline
//! to the session.

use anyhow::{anyhow, Context, Result};
use nusb::transfer::RequestBuffer;
use odlink_usb::{Transport, TransportError};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info, trace};

use crate::config::UsbConfig;

/// Full-speed bulk packet size; IN requests are never smaller
const MAX_PACKET_SIZE: usize = 64;

const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

pub struct NusbTransport {
    device: nusb::Device,
    interface: Option<nusb::Interface>,
    runtime: Runtime,
    poll_timeout: Duration,
}

impl NusbTransport {
    /// Open the first attached device matching the configured ids and serial
    pub fn open(config: &UsbConfig) -> Result<Self> {
        let mut devices = nusb::list_devices().context("Failed to list USB devices")?;
        let found = devices.find(|info| device_matches(info, config)).ok_or_else(|| {
            anyhow!(
                "No USB device {:04x}:{:04x}{} found",
                config.vendor_id,
                config.product_id,
                config
                    .serial
                    .as_deref()
                    .map(|s| format!(" with serial {}", s))
                    .unwrap_or_default()
            )
        })?;

        info!(
            bus = found.bus_number(),
            address = found.device_address(),
            serial = found.serial_number().unwrap_or("-"),
            "Opening USB device"
        );
        let device = found.open().context("Failed to open USB device")?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("Failed to start transfer runtime")?;

        Ok(Self {
            device,
            interface: None,
            runtime,
            poll_timeout: Duration::from_millis(config.poll_timeout_ms),
        })
    }

    fn interface(&self) -> Result<&nusb::Interface, TransportError> {
        self.interface.as_ref().ok_or(TransportError::Closed)
    }
}

fn device_matches(info: &nusb::DeviceInfo, config: &UsbConfig) -> bool {
    info.vendor_id() == config.vendor_id
        && info.product_id() == config.product_id
        && config
            .serial
            .as_deref()
            .map_or(true, |serial| info.serial_number() == Some(serial))
}

impl Transport for NusbTransport {
    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        let claimed = self
            .device
            .claim_interface(interface)
            .map_err(|e| TransportError::Claim {
                interface,
                reason: e.to_string(),
            })?;
        debug!(interface = interface, "Claimed USB interface");
        self.interface = Some(claimed);
        Ok(())
    }

    fn bulk_write(&mut self, data: &[u8], endpoint: u8) -> Result<usize, TransportError> {
        let interface = self.interface()?;
        let transfer = interface.bulk_out(endpoint, data.to_vec());
        let completion = self
            .runtime
            .block_on(async { tokio::time::timeout(WRITE_TIMEOUT, transfer).await })
            .map_err(|_| TransportError::Transfer(format!("bulk OUT 0x{:02x} timed out", endpoint)))?;

        let written = completion
            .into_result()
            .map_err(|e| TransportError::Transfer(e.to_string()))?
            .actual_length();
        trace!(endpoint = endpoint, len = written, "Bulk OUT complete");
        Ok(written)
    }

    fn bulk_read(&mut self, max_len: usize, endpoint: u8) -> Result<Vec<u8>, TransportError> {
        let interface = self.interface()?;
        let transfer = interface.bulk_in(endpoint, RequestBuffer::new(max_len.max(MAX_PACKET_SIZE)));
        let poll_timeout = self.poll_timeout;

        match self
            .runtime
            .block_on(async { tokio::time::timeout(poll_timeout, transfer).await })
        {
            // Dropping the timed-out future cancels the transfer
            Err(_) => Ok(Vec::new()),
            Ok(completion) => {
                let data = completion
                    .into_result()
                    .map_err(|e| TransportError::Transfer(e.to_string()))?;
                trace!(endpoint = endpoint, len = data.len(), "Bulk IN complete");
                Ok(data)
            }
        }
    }

    fn close(&mut self) {
        if self.interface.take().is_some() {
            debug!("Released USB interface");
        }
    }
}
