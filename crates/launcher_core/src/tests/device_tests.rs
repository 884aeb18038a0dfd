use std::{collections::HashMap, sync::Arc};

use super::*;
use crate::test_support::{active_instance, queued, DeckCall, RecordingDeck};
use image::{DynamicImage, RgbImage};

fn preview() -> Arc<DynamicImage> {
    Arc::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        4,
        4,
        image::Rgb([1, 2, 3]),
    )))
}

fn running(id: &str) -> QueuedEvent {
    QueuedEvent {
        key: queued(id).key,
        event: active_instance(id, 1),
    }
}

#[test]
fn absent_device_accepts_every_call() {
    let mut device = DeviceController::absent();
    let (tx, mut rx) = mpsc::unbounded_channel();

    device.clear_all_keys();
    device.set_brightness(70);
    device.subscribe(tx);
    device.clear_key(3);
    device.fill_color(0, ACTIVE_COLOR);
    device.fill_image(1, &[0; 12]);
    device.render(&[KeyVisual::Clear, KeyVisual::Color(READY_COLOR)]);
    device.disconnect("already gone");

    assert!(!device.is_present());
    assert_eq!(device.key_count(), None);
    assert!(rx.try_recv().is_err());
}

#[test]
fn calls_reach_a_present_device() {
    let deck = RecordingDeck::new(4);
    let mut device = DeviceController::new(Box::new(deck.clone()));

    device.clear_all_keys();
    device.set_brightness(150);
    device.fill_color(2, READY_COLOR);

    assert_eq!(
        deck.calls(),
        vec![
            DeckCall::ClearAll,
            DeckCall::Brightness(100),
            DeckCall::Color(2, READY_COLOR),
        ]
    );
    assert_eq!(device.key_count(), Some(4));
}

#[test]
fn io_failure_turns_device_absent_for_good() {
    let deck = RecordingDeck::new(4);
    let mut device = DeviceController::new(Box::new(deck.clone()));

    device.clear_key(0);
    deck.start_failing();
    device.fill_color(1, ACTIVE_COLOR);
    assert!(!device.is_present());

    *deck.fail.lock().expect("fail") = false;
    device.fill_color(2, ACTIVE_COLOR);
    device.clear_all_keys();

    assert_eq!(deck.calls(), vec![DeckCall::Clear(0)]);
}

#[test]
fn out_of_range_keys_are_skipped_without_dropping_the_device() {
    let deck = RecordingDeck::new(2);
    let mut device = DeviceController::new(Box::new(deck.clone()));

    device.fill_color(9, ACTIVE_COLOR);
    device.clear_key(2);

    assert!(device.is_present());
    assert!(deck.calls().is_empty());
}

#[test]
fn render_stops_once_the_device_is_lost() {
    let deck = RecordingDeck::new(3);
    let mut device = DeviceController::new(Box::new(deck.clone()));
    deck.start_failing();

    device.render(&[
        KeyVisual::Clear,
        KeyVisual::Color(ACTIVE_COLOR),
        KeyVisual::Clear,
    ]);

    assert!(!device.is_present());
    assert!(deck.calls().is_empty());
}

#[test]
fn subscription_forwards_key_ups_and_errors() {
    let deck = RecordingDeck::new(3);
    let mut device = DeviceController::new(Box::new(deck.clone()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    device.subscribe(tx);
    deck.press(2);
    deck.report_error("usb reset");

    assert!(matches!(rx.try_recv(), Ok(LauncherInput::KeyUp(2))));
    assert!(matches!(
        rx.try_recv(),
        Ok(LauncherInput::DeviceError(message)) if message == "usb reset"
    ));
}

#[test]
fn plan_maps_slot_states_to_palette() {
    let table = SlotTable::from_slots(vec![Some(queued("a")), None, Some(running("b"))]);
    let visuals = plan_render(
        &table,
        &HashMap::new(),
        KeyPalette::default(),
        KeySize::new(8, 8),
    );

    assert_eq!(
        visuals,
        vec![
            KeyVisual::Color(READY_COLOR),
            KeyVisual::Clear,
            KeyVisual::Color(ACTIVE_COLOR),
        ]
    );
}

#[test]
fn plan_composes_available_art_and_falls_back_per_key() {
    let mut with_art = running("a");
    with_art.event.preview_url = Some("http://art/a.png".to_string());
    let mut broken_art = queued("b");
    broken_art.event.preview_url = Some("http://art/b.png".to_string());
    let mut unloaded_art = queued("c");
    unloaded_art.event.preview_url = Some("http://art/c.png".to_string());

    let mut artwork = HashMap::new();
    artwork.insert("http://art/a.png".to_string(), preview());
    artwork.insert(
        "http://art/b.png".to_string(),
        Arc::new(DynamicImage::ImageRgb8(RgbImage::new(0, 0))),
    );

    let table = SlotTable::from_slots(vec![Some(with_art), Some(broken_art), Some(unloaded_art)]);
    let visuals = plan_render(&table, &artwork, KeyPalette::default(), KeySize::new(8, 8));

    assert!(matches!(&visuals[0], KeyVisual::Image(rgb) if rgb.len() == 8 * 8 * 3));
    assert_eq!(visuals[1], KeyVisual::Color(READY_COLOR));
    assert_eq!(visuals[2], KeyVisual::Color(READY_COLOR));
}

#[test]
fn render_applies_every_visual_in_key_order() {
    let deck = RecordingDeck::new(3);
    let mut device = DeviceController::new(Box::new(deck.clone()));

    device.render(&[
        KeyVisual::Image(vec![0; 8 * 8 * 3]),
        KeyVisual::Clear,
        KeyVisual::Color(ACTIVE_COLOR),
    ]);

    assert_eq!(
        deck.calls(),
        vec![
            DeckCall::Image(0, 192),
            DeckCall::Clear(1),
            DeckCall::Color(2, ACTIVE_COLOR),
        ]
    );
}
