//! `miroute watch` handler: continuous polling across every router.
//!
//! One updater task per configured router, all feeding the same
//! `SignalBus`. New-device and refresh events stream to stdout until
//! Ctrl-C, then each updater is stopped and awaited so snapshots land
//! in the cache.

use std::time::Duration;

use chrono::Local;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use miroute_core::{DeviceRecord, RefreshEvent, SignalBus, UpdaterHandle};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(config: &Config, global: &GlobalOpts, args: WatchArgs) -> Result<(), CliError> {
    if args.interval == Some(0) {
        return Err(CliError::Validation {
            field: "--interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let mut selected = config::select_routers(config, global)?;
    if let Some(secs) = args.interval {
        for settings in &mut selected {
            settings.scan_interval = Duration::from_secs(secs);
        }
    }

    let bus = SignalBus::default();
    let mut new_devices = bus.subscribe_new_devices();
    let mut refreshes = bus.subscribe_refresh();

    let mut handles = Vec::new();
    let mut tasks = Vec::new();
    for settings in selected {
        let updater = util::build_updater(settings, bus.clone())?;
        handles.push(updater.handle());
        tasks.push(tokio::spawn(updater.run()));
    }

    let color = output::should_color(&global.color);
    let json = matches!(global.output, OutputFormat::Json);
    if !json {
        let banner = format!("watching {} router(s), ctrl-c to stop", handles.len());
        output::print_output(&output::dim(&banner, color), global.quiet);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            device = new_devices.recv() => match device {
                Ok(device) => print_new_device(&device, json, color),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            event = refreshes.recv() => match event {
                Ok(event) => print_refresh(&event, &handles, json, color, global.quiet),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    for handle in &handles {
        handle.stop();
    }
    for task in tasks {
        let _ = task.await;
    }
    info!("watch stopped");
    Ok(())
}

// ── Event lines ─────────────────────────────────────────────────────

fn print_new_device(device: &DeviceRecord, json: bool, color: bool) {
    if json {
        let line = serde_json::json!({
            "event": "new_device",
            "name": device.name,
            "mac": device.mac.as_str(),
            "ip": device.ip,
            "connection": device.connection.phrase(),
        });
        output::print_output(&line.to_string(), false);
        return;
    }
    let stamp = Local::now().format("%H:%M:%S");
    let ip = device.ip.map_or_else(String::new, |ip| format!(" {ip}"));
    let line = format!(
        "{stamp} {} {} ({}){ip} via {}",
        output::good("new device", color),
        device.name,
        device.mac,
        device.connection.phrase()
    );
    output::print_output(&line, false);
}

fn print_refresh(
    event: &RefreshEvent,
    handles: &[UpdaterHandle],
    json: bool,
    color: bool,
    quiet: bool,
) {
    let state = handles
        .iter()
        .find(|h| h.entry_id() == event.entry_id)
        .map(UpdaterHandle::state);
    if json {
        let line = serde_json::json!({
            "event": "refresh",
            "router": event.entry_id,
            "token": event.token,
            "success": event.success,
            "online": state.as_ref().map(|s| s.online_device_count()),
            "tracked": state.as_ref().map(|s| s.device_count()),
        });
        output::print_output(&line.to_string(), quiet);
        return;
    }
    let stamp = Local::now().format("%H:%M:%S");
    let verdict = if event.success {
        output::good("ok", color)
    } else {
        output::bad("failed", color)
    };
    let counts = state
        .map(|s| {
            format!(
                ", {} online, {} tracked",
                s.online_device_count(),
                s.device_count()
            )
        })
        .unwrap_or_default();
    let line = format!("{stamp} {} {verdict}{counts}", event.entry_id);
    output::print_output(&line, quiet);
}
