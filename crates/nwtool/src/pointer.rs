//! Virtual absolute pointer on uinput.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use hid_nextwindow_protocol::{AXIS_MAX, PointerEmitter, PointerUpdate};
use std::io;
use tracing::info;

pub const DEVICE_NAME: &str = "NextWindow";

/// uinput device with ABS_X/ABS_Y in `[0, AXIS_MAX]` and left/right buttons.
///
/// BTN_TOUCH is declared but never sent so the device is classified as a
/// pointer rather than a joystick.
pub struct UinputPointer {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl UinputPointer {
    pub fn create() -> io::Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_LEFT);
        keys.insert(Key::BTN_RIGHT);
        keys.insert(Key::BTN_TOUCH);

        let axis = AbsInfo::new(0, 0, AXIS_MAX, 0, 0, 0);
        let device = VirtualDeviceBuilder::new()?
            .name(DEVICE_NAME)
            .input_id(InputId::new(BusType::BUS_RS232, 0, 0, 0))
            .with_keys(&keys)?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_X, axis))?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_Y, axis))?
            .build()?;
        info!("Created uinput pointer '{DEVICE_NAME}'");

        Ok(Self {
            device,
            pending: Vec::with_capacity(4),
        })
    }
}

/// Events for one update, without the trailing SYN_REPORT.
pub fn pointer_events(update: PointerUpdate) -> [InputEvent; 4] {
    [
        InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, update.x),
        InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_Y.0, update.y),
        InputEvent::new(EventType::KEY, Key::BTN_LEFT.code(), i32::from(update.left)),
        InputEvent::new(EventType::KEY, Key::BTN_RIGHT.code(), i32::from(update.right)),
    ]
}

impl PointerEmitter for UinputPointer {
    fn move_to(&mut self, update: PointerUpdate) -> io::Result<()> {
        self.pending.extend(pointer_events(update));
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        // emit() appends SYN_REPORT.
        let result = self.device.emit(&self.pending);
        self.pending.clear();
        result
    }
}
