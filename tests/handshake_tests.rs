//! Integration tests for the configure/ack/commit sequence
//!
//! The request queue stands in for a compositor: every test replays a
//! sequence of events and checks the ordering rules on what went out.

use anyhow::Result;
use waysnitch::{
    client::{ClientCore, Request},
    config::ClientConfig,
    input::PointerEvent,
    protocol::HandshakeState,
};

fn window(config: &ClientConfig) -> Result<ClientCore> {
    let mut core = ClientCore::new(config);
    core.on_global(1, "wl_compositor", 4);
    core.on_global(2, "wl_shm", 1);
    core.on_global(3, "xdg_wm_base", 3);
    core.on_global(4, "wl_seat", 4);
    core.finish_initial_sync()?;
    core.create_window()?;
    core.on_seat_capabilities(4, 1)?;
    Ok(core)
}

fn enter(core: &mut ClientCore) -> Result<()> {
    core.on_pointer(4, PointerEvent::Enter { serial: 1, x: 0.0, y: 0.0 })?;
    Ok(())
}

/// Walks the request log checking that no frame precedes the first ack and
/// that every configure was acked before the following commit
fn assert_well_ordered(requests: &[Request], configures: &[u32]) {
    let mut acked = Vec::new();
    for request in requests {
        match request {
            Request::AckConfigure { serial } => acked.push(*serial),
            Request::Present { .. } => {
                assert!(!acked.is_empty(), "frame committed before any ack");
                let seen = configures.iter().filter(|s| acked.contains(s)).count();
                assert_eq!(seen, acked.len(), "ack for a serial never sent");
            }
            _ => {}
        }
    }
}

#[test]
fn test_no_present_before_first_ack() -> Result<()> {
    let mut core = window(&ClientConfig::default())?;
    enter(&mut core)?;
    core.on_toplevel_configure(640, 480, &[]);

    let requests = core.take_requests();
    assert!(!requests
        .iter()
        .any(|r| matches!(r, Request::Present { .. } | Request::AllocateBuffer { .. })));
    assert_eq!(core.state(), HandshakeState::ConfigurePending);

    // The log line is kept and shows up in the first frame
    assert_eq!(core.event_log().len(), 1);
    Ok(())
}

#[test]
fn test_configure_is_acked_with_exact_serial() -> Result<()> {
    let mut core = window(&ClientConfig::default())?;
    core.take_requests();

    core.on_toplevel_configure(640, 480, &[]);
    core.on_surface_configure(0xdead_beef);

    let requests = core.take_requests();
    assert_eq!(requests[0], Request::AckConfigure { serial: 0xdead_beef });
    assert_eq!(
        requests[1],
        Request::AllocateBuffer {
            width: 640,
            height: 480
        }
    );
    assert_eq!(
        requests[2],
        Request::Present {
            width: 640,
            height: 480
        }
    );
    assert!(core.is_configured());
    assert_eq!(core.handshake().last_acked_serial(), Some(0xdead_beef));
    Ok(())
}

#[test]
fn test_every_configure_acked_before_commit() -> Result<()> {
    let mut core = window(&ClientConfig::default())?;
    let mut all = core.take_requests();

    let serials = [5, 6, 9];
    for serial in serials {
        core.on_surface_configure(serial);
        enter(&mut core)?;
        core.on_buffer_release();
        all.extend(core.take_requests());
    }

    let acks: Vec<u32> = all
        .iter()
        .filter_map(|r| match r {
            Request::AckConfigure { serial } => Some(*serial),
            _ => None,
        })
        .collect();
    assert_eq!(acks, serials);
    assert_well_ordered(&all, &serials);

    // One buffer for the whole session
    let allocations = all
        .iter()
        .filter(|r| matches!(r, Request::AllocateBuffer { .. } | Request::ReallocateBuffer { .. }))
        .count();
    assert_eq!(allocations, 1);
    Ok(())
}

#[test]
fn test_ping_answered_in_every_state() -> Result<()> {
    let mut core = ClientCore::new(&ClientConfig::default());
    core.on_ping(1);
    assert_eq!(core.take_requests(), vec![Request::Pong { serial: 1 }]);

    let mut core = window(&ClientConfig::default())?;
    core.take_requests();
    core.on_ping(2);
    assert_eq!(core.take_requests(), vec![Request::Pong { serial: 2 }]);

    core.on_surface_configure(3);
    core.take_requests();
    core.on_ping(4);
    assert_eq!(core.take_requests(), vec![Request::Pong { serial: 4 }]);

    core.on_toplevel_close();
    core.on_ping(5);
    assert_eq!(core.take_requests(), vec![Request::Pong { serial: 5 }]);
    Ok(())
}

#[test]
fn test_close_ends_session() -> Result<()> {
    let mut core = window(&ClientConfig::default())?;
    core.on_surface_configure(1);
    core.on_buffer_release();
    core.take_requests();

    core.on_toplevel_close();
    assert!(core.is_closed());
    assert_eq!(core.state(), HandshakeState::Closed);

    enter(&mut core)?;
    assert!(core.take_requests().is_empty());
    Ok(())
}

#[test]
fn test_non_positive_size_keeps_current() -> Result<()> {
    let mut core = window(&ClientConfig::default())?;
    core.on_toplevel_configure(0, 300, &[]);
    core.on_toplevel_configure(-1, -1, &[]);
    assert_eq!(core.window_size(), (800, 600));

    core.on_surface_configure(1);
    assert!(core.take_requests().contains(&Request::AllocateBuffer {
        width: 800,
        height: 600
    }));
    Ok(())
}

#[test]
fn test_resize_ignored_by_default() -> Result<()> {
    let mut core = window(&ClientConfig::default())?;
    core.on_surface_configure(1);
    core.on_buffer_release();
    core.take_requests();

    core.on_toplevel_configure(1280, 720, &[]);
    core.on_surface_configure(2);

    assert_eq!(
        core.take_requests(),
        vec![
            Request::AckConfigure { serial: 2 },
            Request::Present {
                width: 800,
                height: 600
            },
        ]
    );
    assert_eq!(core.window_size(), (1280, 720));
    Ok(())
}

#[test]
fn test_resize_reallocates_when_enabled() -> Result<()> {
    let mut config = ClientConfig::default();
    config.window.resize_buffer_on_configure = true;

    let mut core = window(&config)?;
    core.on_surface_configure(1);
    core.take_requests();

    // Still held by the compositor; the new buffer is free
    core.on_toplevel_configure(1280, 720, &[]);
    core.on_surface_configure(2);

    assert_eq!(
        core.take_requests(),
        vec![
            Request::AckConfigure { serial: 2 },
            Request::ReallocateBuffer {
                width: 1280,
                height: 720
            },
            Request::Present {
                width: 1280,
                height: 720
            },
        ]
    );
    Ok(())
}

#[test]
fn test_single_pending_redraw_while_busy() -> Result<()> {
    let mut core = window(&ClientConfig::default())?;
    core.on_surface_configure(1);
    core.take_requests();

    for _ in 0..5 {
        enter(&mut core)?;
    }
    assert!(core.take_requests().is_empty());
    assert!(core.redraw_pending());

    core.on_buffer_release();
    let presents = core
        .take_requests()
        .into_iter()
        .filter(|r| matches!(r, Request::Present { .. }))
        .count();
    assert_eq!(presents, 1);

    // Nothing new to draw
    core.on_buffer_release();
    assert!(core.take_requests().is_empty());
    Ok(())
}
