#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;

use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_rp::adc::{self, Adc};
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::RoscRng;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Flex, Level, Output, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{self, Async, Uart, UartRx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::Instant;

use {defmt_rtt as _, panic_probe as _};

use boiler_rs::acquisition::{Acquisition, SharedReadings};
use boiler_rs::board::{FlashStore, RpBoard, RpConverter, SerialSink, FLASH_SIZE};
use boiler_rs::command::{Command, Parser};
use boiler_rs::control::Controller;
use boiler_rs::heartbeat::Heartbeat;
use boiler_rs::state::Thresholds;
use boiler_rs::status::BANNER;
use boiler_rs::HEARTBEAT_INTERVAL_MS;

bind_interrupts!(struct Irqs {
    UART0_IRQ => uart::InterruptHandler<UART0>;
});

static READINGS: SharedReadings = SharedReadings::new();
// Only touched from the ADC interrupt once installed
static ACQUISITION: Mutex<CriticalSectionRawMutex, RefCell<Option<(Acquisition, RpConverter)>>> =
    Mutex::new(RefCell::new(None));
static COMMANDS: Channel<CriticalSectionRawMutex, Command, 4> = Channel::new();

#[interrupt]
unsafe fn ADC_IRQ_FIFO() {
    ACQUISITION.lock(|cell| {
        if let Some((acquisition, converter)) = cell.borrow_mut().as_mut() {
            acquisition.on_conversion(converter, &READINGS);
        }
    });
}

#[embassy_executor::task]
async fn command_reader(mut rx: UartRx<'static, UART0, Async>) {
    let mut parser = Parser::new();
    let mut byte = [0u8; 1];
    loop {
        match rx.read(&mut byte).await {
            Ok(()) => {
                if let Some(command) = parser.feed(byte[0]) {
                    COMMANDS.send(command).await;
                }
            }
            Err(e) => warn!("uart rx error: {:?}", e),
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Program start");
    let p = embassy_rp::init(Default::default());

    // Serial link
    let uart = Uart::new(p.UART0, p.PIN_0, p.PIN_1, Irqs, p.DMA_CH0, p.DMA_CH1, uart::Config::default());
    let (tx, rx) = uart.split();
    let mut sink = SerialSink::new(tx);
    sink.write_line(BANNER);
    spawner.spawn(command_reader(rx)).unwrap();

    // Analog inputs: the embassy driver resets and enables the block, the interrupt takes it from there
    let _adc = Adc::new_blocking(p.ADC, adc::Config::default());
    let _h0 = adc::Channel::new_pin(p.PIN_26, Pull::None);
    let _h1 = adc::Channel::new_pin(p.PIN_27, Pull::None);
    let _temperature = adc::Channel::new_pin(p.PIN_28, Pull::None);
    let _voltage = adc::Channel::new_pin(p.PIN_29, Pull::None);

    let mut converter = RpConverter::new();
    let mut acquisition = Acquisition::new(Thresholds::default());
    acquisition.start(&mut converter);
    ACQUISITION.lock(|cell| *cell.borrow_mut() = Some((acquisition, converter)));
    interrupt::ADC_IRQ_FIFO.set_priority(Priority::P1);
    unsafe { interrupt::ADC_IRQ_FIFO.enable() };

    // Buttons and configuration
    let board = RpBoard::new(Flex::new(p.PIN_10), Flex::new(p.PIN_11));
    let flash = Flash::<_, Blocking, FLASH_SIZE>::new_blocking(p.FLASH);
    let store = FlashStore::new(flash);

    let mut controller = Controller::new(board, store, sink, RoscRng, &READINGS);
    info!("desired state {}", controller.desired_state());

    let mut heartbeat = Heartbeat::new(Output::new(p.PIN_25, Level::Low), HEARTBEAT_INTERVAL_MS);

    info!("Begin loop logic");
    loop {
        heartbeat.blink(Instant::now().as_millis());
        controller.poll(COMMANDS.try_receive().ok());
        yield_now().await;
    }
}
