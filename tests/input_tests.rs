//! Integration tests for seats and the event log
//!
//! Input arrives through `ClientCore` exactly as the seat listeners feed it;
//! assertions are made on the newest event log entry and on the device
//! requests sent to the compositor.

use anyhow::Result;
use waysnitch::{
    client::{ClientCore, Request},
    config::ClientConfig,
    error::ClientError,
    input::{ButtonState, Device, KeyState, KeyboardEvent, PointerEvent, TouchEvent},
};

const SEAT: u32 = 7;

fn configured(caps: u32) -> Result<ClientCore> {
    let mut core = ClientCore::new(&ClientConfig::default());
    core.on_global(1, "wl_compositor", 4);
    core.on_global(2, "wl_shm", 1);
    core.on_global(3, "xdg_wm_base", 3);
    core.on_global(SEAT, "wl_seat", 9);
    core.finish_initial_sync()?;
    core.create_window()?;
    core.on_surface_configure(1);
    core.on_seat_capabilities(SEAT, caps)?;
    core.take_requests();
    Ok(core)
}

fn newest(core: &ClientCore) -> String {
    core.event_log()
        .newest()
        .map(|e| e.message.clone())
        .unwrap_or_default()
}

fn key(code: u32) -> KeyboardEvent {
    KeyboardEvent::Key {
        serial: 1,
        time: 0,
        key: code,
        state: KeyState::Pressed,
    }
}

#[test]
fn test_key_press_is_labelled() -> Result<()> {
    let mut core = configured(2)?;
    core.on_keyboard(SEAT, key(30))?;
    assert_eq!(newest(&core), "Down A (30)");

    core.on_keyboard(SEAT, key(999))?;
    assert_eq!(newest(&core), "Down KEY_999 (999)");

    core.on_keyboard(
        SEAT,
        KeyboardEvent::Key {
            serial: 2,
            time: 1,
            key: 30,
            state: KeyState::from_raw(0),
        },
    )?;
    assert_eq!(newest(&core), "Up A (30)");
    Ok(())
}

#[test]
fn test_button_press_is_logged() -> Result<()> {
    let mut core = configured(1)?;
    core.on_pointer(
        SEAT,
        PointerEvent::Button {
            serial: 1,
            time: 0,
            button: 1,
            state: ButtonState::from_raw(1),
        },
    )?;
    assert_eq!(newest(&core), "Button 1 Press");
    Ok(())
}

#[test]
fn test_silent_events_do_not_log() -> Result<()> {
    let mut core = configured(7)?;
    core.on_pointer(SEAT, PointerEvent::Motion { time: 0, x: 1.0, y: 1.0 })?;
    core.on_pointer(SEAT, PointerEvent::Frame)?;
    core.on_keyboard(SEAT, KeyboardEvent::RepeatInfo { rate: 25, delay: 600 })?;
    core.on_keyboard(SEAT, KeyboardEvent::Keymap { format: 1, size: 48 })?;
    core.on_touch(SEAT, TouchEvent::Frame)?;
    assert!(core.event_log().is_empty());
    Ok(())
}

#[test]
fn test_capability_acquire_and_release() -> Result<()> {
    let mut core = configured(0)?;

    core.on_seat_capabilities(SEAT, 1 | 2)?;
    assert_eq!(
        core.take_requests(),
        vec![
            Request::GetDevice {
                seat: SEAT,
                device: Device::Pointer
            },
            Request::GetDevice {
                seat: SEAT,
                device: Device::Keyboard
            },
        ]
    );

    // Repeating the mask creates nothing new
    core.on_seat_capabilities(SEAT, 1 | 2)?;
    assert!(core.take_requests().is_empty());

    core.on_seat_capabilities(SEAT, 1)?;
    assert_eq!(
        core.take_requests(),
        vec![Request::ReleaseDevice {
            seat: SEAT,
            device: Device::Keyboard
        }]
    );

    let seat = core.seats().get(SEAT).expect("seat tracked");
    assert!(seat.has(Device::Pointer));
    assert!(!seat.has(Device::Keyboard));

    // Late keyboard events after the release are dropped
    core.on_keyboard(SEAT, key(30))?;
    assert!(core.event_log().is_empty());
    Ok(())
}

#[test]
fn test_unknown_seat_is_not_fatal() -> Result<()> {
    let mut core = configured(1)?;

    let err = core.on_seat_capabilities(99, 1).unwrap_err();
    assert!(matches!(err, ClientError::UnknownSeat(99)));
    assert!(!err.is_fatal());

    assert!(core.on_seat_name(99, "seat-x".to_string()).is_err());
    assert!(core.take_requests().is_empty());

    core.on_seat_name(SEAT, "seat0".to_string())?;
    assert_eq!(core.seats().get(SEAT).and_then(|s| s.name()), Some("seat0"));
    Ok(())
}

#[test]
fn test_touch_cancel_clears_contacts() -> Result<()> {
    let mut core = configured(4)?;
    core.on_touch(SEAT, TouchEvent::Down { serial: 1, time: 0, id: 3, x: 1.0, y: 1.0 })?;
    assert_eq!(newest(&core), "Touch Down 3");

    core.on_touch(SEAT, TouchEvent::Cancel)?;
    assert_eq!(newest(&core), "Touch Cancel");

    let touch = core.seats().get(SEAT).and_then(|s| s.touch()).expect("touch");
    assert_eq!(touch.active_contacts().count(), 0);
    Ok(())
}

#[test]
fn test_event_log_keeps_newest_thirty() -> Result<()> {
    let mut core = configured(2)?;
    for code in 0..31 {
        core.on_keyboard(SEAT, key(1000 + code))?;
    }

    let log = core.event_log();
    assert_eq!(log.len(), 30);
    let messages: Vec<String> = log.iter().map(|e| e.message.clone()).collect();
    assert_eq!(messages.first().map(String::as_str), Some("Down KEY_1001 (1001)"));
    assert_eq!(messages.last().map(String::as_str), Some("Down KEY_1030 (1030)"));
    Ok(())
}

#[test]
fn test_focus_lines() -> Result<()> {
    let mut core = configured(3)?;
    core.on_pointer(SEAT, PointerEvent::Enter { serial: 1, x: 2.0, y: 3.0 })?;
    assert_eq!(newest(&core), "Pointer Enter");
    core.on_pointer(SEAT, PointerEvent::Axis { time: 0, axis: 0, value: 10.0 })?;
    assert_eq!(newest(&core), "Scroll");
    core.on_pointer(SEAT, PointerEvent::Leave { serial: 2 })?;
    assert_eq!(newest(&core), "Pointer Leave");

    core.on_keyboard(SEAT, KeyboardEvent::Enter { serial: 3, keys: vec![] })?;
    assert_eq!(newest(&core), "Keyboard Focus Gained");
    core.on_keyboard(SEAT, KeyboardEvent::Leave { serial: 4 })?;
    assert_eq!(newest(&core), "Keyboard Focus Lost");
    Ok(())
}
