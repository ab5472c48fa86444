//! Telechir - Rover Operator Console Firmware
//!
//! Main firmware binary for the RP2040-based handheld pendant that drives
//! a four-wheel rover with a pan/rotate camera head over a framed serial
//! radio link.
//!
//! Named after the Greek "telechir" ("remote hand") - the classical
//! robotics term for a machine operated from a distance.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel, InterruptHandler as AdcInterruptHandler};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use heapless::Vec;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use telechir_core::config::ConsoleConfig;
use telechir_core::drive::DirectionKey;
use telechir_protocol::ServoId;

use crate::tasks::{Button, ButtonRole, KnobBank};

mod channels;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    ADC_IRQ_FIFO => AdcInterruptHandler;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Telechir console starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Console configuration is compiled in; the console keeps no
    // persisted state and re-synchronizes from the rover on connect
    let config = ConsoleConfig::standard();

    // Setup UART for the rover radio link
    let uart_config = {
        let mut cfg = UartConfig::default();
        cfg.baudrate = config.link.baud;
        cfg
    };

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 1024]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("Radio link UART initialized ({} baud)", config.link.baud);

    // Pendant buttons, active-low with pull-ups
    let mut buttons: Vec<Button, { tasks::input::MAX_BUTTONS }> = Vec::new();
    let button_list = [
        Button::new(
            Input::new(p.PIN_2, Pull::Up),
            ButtonRole::Drive(DirectionKey::Forward),
        ),
        Button::new(
            Input::new(p.PIN_3, Pull::Up),
            ButtonRole::Drive(DirectionKey::Backward),
        ),
        Button::new(
            Input::new(p.PIN_4, Pull::Up),
            ButtonRole::Drive(DirectionKey::Left),
        ),
        Button::new(
            Input::new(p.PIN_5, Pull::Up),
            ButtonRole::Drive(DirectionKey::Right),
        ),
        Button::new(Input::new(p.PIN_6, Pull::Up), ButtonRole::Move(ServoId::Pan)),
        Button::new(Input::new(p.PIN_7, Pull::Up), ButtonRole::Stop(ServoId::Pan)),
        Button::new(
            Input::new(p.PIN_8, Pull::Up),
            ButtonRole::SpeedCycle(ServoId::Pan),
        ),
        Button::new(
            Input::new(p.PIN_9, Pull::Up),
            ButtonRole::Reverse(ServoId::Pan),
        ),
        Button::new(
            Input::new(p.PIN_10, Pull::Up),
            ButtonRole::Move(ServoId::Rotate),
        ),
        Button::new(
            Input::new(p.PIN_11, Pull::Up),
            ButtonRole::Stop(ServoId::Rotate),
        ),
        Button::new(
            Input::new(p.PIN_12, Pull::Up),
            ButtonRole::SpeedCycle(ServoId::Rotate),
        ),
        Button::new(
            Input::new(p.PIN_13, Pull::Up),
            ButtonRole::Reverse(ServoId::Rotate),
        ),
        Button::new(Input::new(p.PIN_14, Pull::Up), ButtonRole::Stream),
    ];
    for button in button_list {
        // Sized above the button count; push cannot fail
        let _ = buttons.push(button);
    }

    // Knobs on the ADC: pan angle, rotate angle, drive speed
    let adc = Adc::new(p.ADC, Irqs, embassy_rp::adc::Config::default());
    let knobs = KnobBank {
        pan: Channel::new_pin(p.PIN_26, Pull::None),
        rotate: Channel::new_pin(p.PIN_27, Pull::None),
        drive_speed: Channel::new_pin(p.PIN_28, Pull::None),
    };

    info!("Input hardware initialized");

    // Spawn tasks
    unwrap!(spawner.spawn(tasks::link_rx_task(rx)));
    unwrap!(spawner.spawn(tasks::link_tx_task(tx)));
    unwrap!(spawner.spawn(tasks::coordinator_task(config)));
    unwrap!(spawner.spawn(tasks::watchdog_task(config.watchdog.tick_ms)));
    unwrap!(spawner.spawn(tasks::tick_task()));
    unwrap!(spawner.spawn(tasks::input_task(buttons, adc, knobs)));

    info!("Telechir console running");
}
