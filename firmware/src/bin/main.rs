#![no_std]
#![no_main]

use defmt::{info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_rp::adc::{self, Adc};
use embassy_rp::bind_interrupts;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::peripherals::{UART0, USB};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::uart::{Config as UartConfig, Uart};
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_time::{Duration, Ticker};
use embassy_usb::class::cdc_acm;
use embassy_usb::{Builder, Config as UsbConfig};
use remote_core::{FlashParamStore, Remote};
use remote_firmware::console::{
    configure_usb_console, run_line, ConsoleLine, ConsoleText, LineChannel, OutputChannel,
    OutputSender,
};
use remote_firmware::flash::FLASH_SIZE;
use remote_firmware::radio::{InboundChannel, ReplyChannel, BAUD_RATE};
use remote_firmware::{
    BoardRemote, ConsoleReader, ConsoleWriter, EmbassyClock, InputPins, ParamsFlash,
    RadioReceiver, RgbLeds, XBeeRadio, ROLE, TICK_MS,
};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART0_IRQ => embassy_rp::uart::InterruptHandler<UART0>;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
    ADC_IRQ_FIFO => adc::InterruptHandler;
});

/// Envelopes and local replies from the radio RX task.
static INBOUND: InboundChannel = Channel::new();
static REPLIES: ReplyChannel = Channel::new();

/// Console lines in, command output out.
static CONSOLE_LINES: LineChannel = Channel::new();
static CONSOLE_OUTPUT: OutputChannel = Channel::new();

/// USB device configuration buffers.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// CDC-ACM state.
static CDC_STATE: StaticCell<cdc_acm::State> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("{} remote starting...", ROLE.name());

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Radio ---
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = BAUD_RATE;

    let uart = Uart::new(
        p.UART0,
        p.PIN_0, // TX
        p.PIN_1, // RX
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        uart_config,
    );
    let (tx, rx) = uart.split();
    spawner.spawn(radio_rx_task(RadioReceiver::new(rx, &INBOUND, &REPLIES)).unwrap());

    // --- USB console ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(0x1209, 0x0001); // pid.codes test VID/PID
    usb_config.manufacturer = Some("Droid Remote");
    usb_config.product = Some(if cfg!(feature = "left-remote") {
        "Left Remote"
    } else {
        "Right Remote"
    });
    usb_config.serial_number = Some("001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        MSOS_DESCRIPTOR.init([0; 256]),
        CONTROL_BUF.init([0; 64]),
    );
    let class = configure_usb_console(&mut builder, CDC_STATE.init(cdc_acm::State::new()));
    let usb_device = builder.build();
    let (cdc_tx, cdc_rx) = class.split();

    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(console_rx_task(ConsoleReader::new(cdc_rx, &CONSOLE_LINES)).unwrap());
    spawner.spawn(console_tx_task(ConsoleWriter::new(cdc_tx, &CONSOLE_OUTPUT)).unwrap());

    // --- LEDs ---
    let leds = RgbLeds::new(
        [
            Pwm::new_output_ab(p.PWM_SLICE1, p.PIN_2, p.PIN_3, PwmConfig::default()),
            Pwm::new_output_ab(p.PWM_SLICE2, p.PIN_4, p.PIN_5, PwmConfig::default()),
            Pwm::new_output_ab(p.PWM_SLICE3, p.PIN_6, p.PIN_7, PwmConfig::default()),
        ],
        CONSOLE_OUTPUT.sender(),
    );

    // --- Inputs ---
    let inputs = InputPins::new(
        Adc::new(p.ADC, Irqs, adc::Config::default()),
        adc::Channel::new_pin(p.PIN_26, Pull::None),
        adc::Channel::new_pin(p.PIN_27, Pull::None),
        adc::Channel::new_pin(p.PIN_28, Pull::None),
        adc::Channel::new_pin(p.PIN_29, Pull::None),
        [
            Input::new(p.PIN_10, Pull::Up),
            Input::new(p.PIN_11, Pull::Up),
            Input::new(p.PIN_12, Pull::Up),
            Input::new(p.PIN_13, Pull::Up),
            Input::new(p.PIN_14, Pull::Up),
            Input::new(p.PIN_15, Pull::Up),
            Input::new(p.PIN_16, Pull::Up),
            Input::new(p.PIN_17, Pull::Up),
        ],
    );

    // --- Parameters ---
    let flash = Flash::<_, Blocking, FLASH_SIZE>::new_blocking(p.FLASH);
    let store = match FlashParamStore::new(ParamsFlash::new(flash)) {
        Ok(store) => store,
        Err(e) => defmt::panic!("parameter flash unreadable: {}", e),
    };

    // Needs the radio RX task running to answer SH/SL.
    let radio = XBeeRadio::new(tx, &INBOUND, &REPLIES).await;

    let remote = match Remote::new(ROLE, radio, store, leds, EmbassyClock) {
        Ok(remote) => remote,
        Err(e) => defmt::panic!("remote init failed: {}", e),
    };

    spawner.spawn(
        remote_task(
            remote,
            inputs,
            CONSOLE_LINES.receiver(),
            CONSOLE_OUTPUT.sender(),
        )
        .unwrap(),
    );

    info!("{} remote initialized", ROLE.name());
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) {
    device.run().await;
}

/// Radio RX task - parses XBee frames into the inbound and reply queues.
#[embassy_executor::task]
async fn radio_rx_task(mut receiver: RadioReceiver<'static>) {
    receiver.run().await;
}

#[embassy_executor::task]
async fn console_rx_task(mut reader: ConsoleReader<'static>) {
    reader.run().await;
}

#[embassy_executor::task]
async fn console_tx_task(mut writer: ConsoleWriter<'static>) {
    writer.run().await;
}

/// Remote task - ticks the remote and runs console commands between ticks.
#[embassy_executor::task]
async fn remote_task(
    mut remote: BoardRemote,
    mut inputs: InputPins<'static>,
    lines: Receiver<'static, CriticalSectionRawMutex, ConsoleLine, 2>,
    output: OutputSender<'static>,
) {
    let mut ticker = Ticker::every(Duration::from_millis(TICK_MS));
    loop {
        match select(ticker.next(), lines.receive()).await {
            Either::First(()) => {
                let sample = inputs.sample().await;
                remote.step(&sample).await;
            }
            Either::Second(line) => {
                let mut text = ConsoleText::new();
                run_line(&mut remote, &mut inputs, &line, &mut text).await;
                if output.try_send(text).is_err() {
                    warn!("console output dropped");
                }
                // A config exchange may have stalled for up to a second; do
                // not replay the ticks it swallowed.
                ticker.reset();
            }
        }
    }
}
