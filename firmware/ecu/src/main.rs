//! Board binary: wires the kernel, CAN communication stack, RTE, and
//! software components into one concrete Cortex-M3 VCU image.
//!
//! Grounded in `app/main.c` (`EcuM_Init` → `StartOS`), `app/tasks/InitTask.c`
//! (peripheral/stack init order, then arm the two periodic alarms and the
//! diagnostic schedule table), `app/tasks/Task_A.c`/`Task_B.c` (the two
//! periodic task bodies), and `app/hooks/Os_Hook.c` (startup logging). Task
//! and alarm ids are this file's own compile-time configuration — there is
//! no code generator here, just `const` tables feeding a single
//! statically allocated kernel aggregate.

#![no_std]
#![no_main]

use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicPtr, Ordering};

use cortex_m_rt::{entry, exception};
use static_cell::StaticCell;

use os_kernel::action::Action;
use os_kernel::alarm::AlarmConfig;
use os_kernel::counter::CounterConfig;
use os_kernel::id::{CounterId, TaskId};
use os_kernel::ioc::IocChannelConfig;
use os_kernel::klock::KCell;
use os_kernel::schedtbl::{ExpiryPoint, ScheduleTableConfig};
use os_kernel::task::TaskConfig;
use os_kernel::{DefaultHooks, Kernel, KernelConfig};
use os_port_cm3::Cm3Arch;

use comstack::{
    CanIfConfig, CanIfRoutingEntry, CanPduId, ComConfig, ComPduId, ComStack, Direction, IPduConfig,
    PduRConfig, Route, SignalConfig, SignalId, SignalType, TxPduConfig,
};
use can_driver::{CanDriver, CanFrame, CanId, ControllerMode, ErrorState, HwHandle};
use iohwab::{DriveMode, Gear, IoHwAb};
use rte::{Rte, RteSignalIds};

use panic_rtt_target as _;

type KernelT = Kernel<Cm3Arch>;
type ComStackT = ComStack<Cm3Arch, Cm3CanDriver>;
type RteT = Rte<Cm3Arch, Cm3CanDriver, Cm3IoHwAb>;

const NUM_TASKS: usize = 4;
const STACK_SIZE: usize = 1024;

const CORE_CLOCK_HZ: u32 = 16_000_000; // reset-default HSI, no PLL configured
const TICK_HZ: u32 = 1_000;

const ALARM_TASK_A: u8 = 0;
const ALARM_TASK_B: u8 = 1;
const SCHEDULE_TABLE_DIAG: u8 = 0;
const IOC_CHANNEL_DEMO: u8 = 0;
const IOC_RECEIVER_TASK_B: usize = 0;
const TASK_ID_TASK_B: u8 = 3;

// ---- CAN / COM configuration ---------------------------------------------
//
// VCU_Command (0x123, Tx) carries the composed command signals; one Rx PDU
// (0x200) carries the engine speed signal read back from the drivetrain,
// per the board's VCU wire layout.

static TX_PDUS: [TxPduConfig; 1] = [TxPduConfig { dynamic: false }];
static CANIF_ROUTING: [CanIfRoutingEntry; 2] = [
    CanIfRoutingEntry {
        pdu_id: CanPduId::new_unchecked(0),
        can_id: CanId(0x123),
        hth: HwHandle(0),
        direction: Direction::Tx,
    },
    CanIfRoutingEntry {
        pdu_id: CanPduId::new_unchecked(0),
        can_id: CanId(0x200),
        hth: HwHandle(0),
        direction: Direction::Rx,
    },
];
static CANIF_CFG: CanIfConfig = CanIfConfig {
    num_controllers: 1,
    num_tx_pdus: 1,
    num_rx_pdus: 1,
    tx_pdus: &TX_PDUS,
    routing: &CANIF_ROUTING,
    rx_indication: Some(canif_rx_indication_shim),
    tx_confirmation: Some(canif_tx_confirmation_shim),
};

static COM_TX_ROUTES: [Route<ComPduId, CanPduId>; 1] = [Route {
    src: ComPduId::new_unchecked(0),
    dst: CanPduId::new_unchecked(0),
}];
static CAN_RX_ROUTES: [Route<CanPduId, ComPduId>; 1] = [Route {
    src: CanPduId::new_unchecked(0),
    dst: ComPduId::new_unchecked(1),
}];
static CAN_TX_CONFIRM_ROUTES: [Route<CanPduId, ComPduId>; 1] = [Route {
    src: CanPduId::new_unchecked(0),
    dst: ComPduId::new_unchecked(0),
}];
static PDUR_CFG: PduRConfig = PduRConfig {
    com_tx_routes: &COM_TX_ROUTES,
    can_rx_routes: &CAN_RX_ROUTES,
    can_tx_confirm_routes: &CAN_TX_CONFIRM_ROUTES,
};

static IPDUS: [IPduConfig; 2] = [
    IPduConfig {
        id: ComPduId::new_unchecked(0),
        length: 5,
        direction: Direction::Tx,
    },
    IPduConfig {
        id: ComPduId::new_unchecked(1),
        length: 2,
        direction: Direction::Rx,
    },
];
// Byte-for-byte VCU_Command layout: byte 0 throttle percent, byte 1 gear
// selection, byte 2 drive mode, byte 3 brake-active flag, byte 4 low
// nibble alive counter (high nibble reserved zero).
static SIGNALS: [SignalConfig; 6] = [
    SignalConfig {
        ipdu: ComPduId::new_unchecked(0),
        byte_offset: 0,
        bit_offset: 0,
        bit_length: 8,
        ty: SignalType::UnsignedByte,
        direction: Direction::Tx,
    },
    SignalConfig {
        ipdu: ComPduId::new_unchecked(0),
        byte_offset: 1,
        bit_offset: 0,
        bit_length: 8,
        ty: SignalType::UnsignedByte,
        direction: Direction::Tx,
    },
    SignalConfig {
        ipdu: ComPduId::new_unchecked(0),
        byte_offset: 2,
        bit_offset: 0,
        bit_length: 8,
        ty: SignalType::UnsignedByte,
        direction: Direction::Tx,
    },
    SignalConfig {
        ipdu: ComPduId::new_unchecked(0),
        byte_offset: 3,
        bit_offset: 0,
        bit_length: 8,
        ty: SignalType::Boolean,
        direction: Direction::Tx,
    },
    SignalConfig {
        ipdu: ComPduId::new_unchecked(0),
        byte_offset: 4,
        bit_offset: 0,
        bit_length: 4,
        ty: SignalType::UnsignedByte,
        direction: Direction::Tx,
    },
    SignalConfig {
        ipdu: ComPduId::new_unchecked(1),
        byte_offset: 0,
        bit_offset: 0,
        bit_length: 16,
        ty: SignalType::UnsignedHalfWord,
        direction: Direction::Rx,
    },
];
static COM_CFG: ComConfig = ComConfig {
    ipdus: &IPDUS,
    signals: &SIGNALS,
};

static SIGNAL_IDS: RteSignalIds = RteSignalIds {
    throttle: SignalId::new_unchecked(0),
    gear: SignalId::new_unchecked(1),
    drive_mode: SignalId::new_unchecked(2),
    brake_active: SignalId::new_unchecked(3),
    alive: SignalId::new_unchecked(4),
    engine_speed: SignalId::new_unchecked(5),
    vcu_command_ipdu: ComPduId::new_unchecked(0),
};

// ---- kernel configuration --------------------------------------------------

static COUNTERS: [CounterConfig; 1] = [CounterConfig {
    ticks_per_base: 1,
    max_allowed_value: 59_999,
    min_cycles: 1,
}];

static ALARMS: [AlarmConfig; 2] = [
    AlarmConfig {
        counter: CounterId::new_unchecked(0),
        action: Action::ActivateTask(TaskId::new_unchecked(2)),
    },
    AlarmConfig {
        counter: CounterId::new_unchecked(0),
        action: Action::ActivateTask(TaskId::new_unchecked(3)),
    },
];

/// Diagnostic schedule table cycling a callback-only mode signal every 5 s,
/// independent of the VCU command path — `original_source/app/tasks/InitTask.c`'s
/// `Os_SchedTbl_Init` workload, added to this configuration as a second
/// demo of the schedule-table machinery.
static SCHEDULE_TABLES: [ScheduleTableConfig; 1] = [ScheduleTableConfig {
    counter: CounterId::new_unchecked(0),
    expiry_points: [
        Some(ExpiryPoint {
            offset: 0,
            action: Action::Callback(diag_mode_normal),
        }),
        Some(ExpiryPoint {
            offset: 1667,
            action: Action::Callback(diag_mode_warning),
        }),
        Some(ExpiryPoint {
            offset: 3334,
            action: Action::Callback(diag_mode_off),
        }),
    ],
    period: 5000,
}];

static IOC_CHANNELS: [IocChannelConfig; 1] = [IocChannelConfig {}];

static mut IDLE_STACK: [MaybeUninit<u8>; STACK_SIZE] = [MaybeUninit::uninit(); STACK_SIZE];
static mut INIT_STACK: [MaybeUninit<u8>; STACK_SIZE] = [MaybeUninit::uninit(); STACK_SIZE];
static mut TASK_A_STACK: [MaybeUninit<u8>; STACK_SIZE] = [MaybeUninit::uninit(); STACK_SIZE];
static mut TASK_B_STACK: [MaybeUninit<u8>; STACK_SIZE] = [MaybeUninit::uninit(); STACK_SIZE];

static TASKS_CELL: StaticCell<[TaskConfig; NUM_TASKS]> = StaticCell::new();
static KERNEL_CFG_CELL: StaticCell<KernelConfig> = StaticCell::new();
static KERNEL_CELL: StaticCell<KernelT> = StaticCell::new();
static COMSTACK_CELL: StaticCell<ComStackT> = StaticCell::new();
static IO_CELL: StaticCell<Cm3IoHwAb> = StaticCell::new();
static RTE_CELL: StaticCell<RteT> = StaticCell::new();

static KERNEL_PTR: AtomicPtr<KernelT> = AtomicPtr::new(core::ptr::null_mut());
static COMSTACK_PTR: AtomicPtr<ComStackT> = AtomicPtr::new(core::ptr::null_mut());
static RTE_PTR: AtomicPtr<RteT> = AtomicPtr::new(core::ptr::null_mut());

fn kernel() -> &'static KernelT {
    // SAFETY: set once in `main`, before any task or interrupt that could
    // call this runs.
    unsafe { &*KERNEL_PTR.load(Ordering::Acquire) }
}

fn comstack() -> &'static ComStackT {
    unsafe { &*COMSTACK_PTR.load(Ordering::Acquire) }
}

fn rte() -> &'static RteT {
    unsafe { &*RTE_PTR.load(Ordering::Acquire) }
}

extern "C" fn running_sp_slot_shim() -> *mut usize {
    kernel().running_sp_slot()
}

extern "C" fn dispatch_sp_slot_shim() -> *mut usize {
    kernel().dispatch_sp_slot()
}

fn canif_rx_indication_shim(pdu_id: CanPduId, payload: &[u8]) {
    comstack().dispatch_rx_indication(pdu_id, payload);
}

fn canif_tx_confirmation_shim(pdu_id: CanPduId) {
    comstack().dispatch_tx_confirmation(pdu_id);
}

/// Stand-in for the CAN peripheral driver: `can_driver`'s trait boundary is
/// an external collaborator by design, so real bxCAN
/// mailbox/filter register programming is out of scope here. A full board
/// port replaces every method body below with that register access.
struct Cm3CanDriver;

impl Cm3CanDriver {
    const fn new() -> Self {
        Self
    }
}

impl CanDriver for Cm3CanDriver {
    fn write(&self, _hth: HwHandle, _frame: &CanFrame) -> os_kernel::Result<()> {
        Ok(())
    }

    fn set_controller_mode(&self, _controller: u8, _mode: ControllerMode) -> os_kernel::Result<()> {
        Ok(())
    }

    fn controller_error_state(&self, _controller: u8) -> os_kernel::Result<ErrorState> {
        Ok(ErrorState::Active)
    }

    fn set_baudrate(&self, _controller: u8, _baudrate_config_id: u16) -> os_kernel::Result<()> {
        Ok(())
    }
}

/// Stand-in for the I/O hardware abstraction layer: real ADC/DIO channel
/// programming (`IoHwAb_Pedal.c`/`_Brake.c`/`_Gear.c`/`_Mode.c`) is out of
/// scope here for the same reason as `Cm3CanDriver` above.
struct Cm3IoHwAb;

impl Cm3IoHwAb {
    const fn new() -> Self {
        Self
    }
}

impl IoHwAb for Cm3IoHwAb {
    fn read_pedal_percent(&self) -> os_kernel::Result<u8> {
        Ok(0)
    }

    fn read_brake_pressed(&self) -> os_kernel::Result<bool> {
        Ok(false)
    }

    fn read_gear(&self) -> os_kernel::Result<(Gear, bool)> {
        Ok((Gear::P, true))
    }

    fn read_drive_mode(&self) -> os_kernel::Result<DriveMode> {
        Ok(DriveMode::Eco)
    }
}

struct RttLogger;

impl log::Log for RttLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        rtt_target::rprintln!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static RTT_LOGGER: RttLogger = RttLogger;

fn diag_mode_normal() {
    log::info!("diagnostic mode -> Normal");
}

fn diag_mode_warning() {
    log::info!("diagnostic mode -> Warning");
}

fn diag_mode_off() {
    log::info!("diagnostic mode -> Off");
}

/// Owns the command composer's alive counter; kept behind the same
/// critical-section cell discipline as the kernel and COM-stack state even
/// though only `task_b_entry` ever touches it.
static CMD_COMPOSER: KCell<Cm3Arch, swc::CmdComposer> = KCell::new(swc::CmdComposer::new());

fn idle_task_entry() {
    loop {
        cortex_m::asm::wfi();
    }
}

/// `InitTask`: brings every layer up in dependency order, arms the two
/// periodic alarms and the diagnostic schedule table, registers the demo
/// IOC receiver, then terminates — the layers themselves are already live
/// by the time this runs, since `ComStack::new`/`Rte::new` were called in
/// `main` before the scheduler started.
fn init_task_entry() {
    swc::PedalAcq::init();
    swc::BrakeAcq::init();
    swc::GearSelector::init();
    swc::DriveModeMgr::init();
    swc::SafetyManager::init();
    CMD_COMPOSER.with(|c| c.init());

    kernel().set_rel_alarm(ALARM_TASK_A, 10, 10).ok();
    kernel().set_rel_alarm(ALARM_TASK_B, 60, 70).ok();
    kernel().start_schedule_table_rel(SCHEDULE_TABLE_DIAG, 0).ok();
    kernel()
        .ioc_register_receiver(IOC_CHANNEL_DEMO, IOC_RECEIVER_TASK_B, TASK_ID_TASK_B)
        .ok();

    log::info!("init complete");
    kernel().terminate_task().ok();
}

/// `Task_A`: the acquisition/safety-arbitration half of the VCU command
/// path, run every 10 ms. Also publishes the latest pedal reading on the
/// demo IOC channel, independent of the COM/CAN path, to exercise the IOC
/// fan-out machinery outside the signal pipeline.
fn task_a_entry() {
    let r = rte();
    swc::PedalAcq::run_10ms(r);
    swc::DriveModeMgr::run_10ms(r);
    swc::BrakeAcq::run_10ms(r);
    swc::GearSelector::run_10ms(r);
    swc::SafetyManager::run_10ms(r);

    if let Some(pct) = r.read_pedal_out() {
        let _ = kernel().ioc_send(IOC_CHANNEL_DEMO, pct as u32);
    }

    kernel().terminate_task().ok();
}

/// `Task_B`: composes and sends the VCU_Command I-PDU, reads back engine
/// speed, and drains the demo IOC channel `Task_A` publishes to.
fn task_b_entry() {
    if let Ok(value) = kernel().ioc_receive(IOC_CHANNEL_DEMO, IOC_RECEIVER_TASK_B) {
        log::debug!("ioc channel value = {}", value);
    }
    if let Ok(rpm) = rte().read_engine_speed_rpm() {
        log::debug!("engine speed = {} rpm", rpm);
    }

    CMD_COMPOSER.with(|c| c.run_10ms(rte()));

    kernel().terminate_task().ok();
}

#[exception]
fn SysTick() {
    let _ = kernel().increment_counter(0);
}

#[entry]
fn main() -> ! {
    rtt_target::rtt_init_print!();
    log::set_logger(&RTT_LOGGER).ok();
    log::set_max_level(log::LevelFilter::Debug);
    log::info!("ecu booting");

    let comstack_ref = COMSTACK_CELL.init(
        ComStack::new(&CANIF_CFG, &PDUR_CFG, &COM_CFG, Cm3CanDriver::new())
            .expect("valid comstack configuration"),
    );
    COMSTACK_PTR.store(comstack_ref as *const _ as *mut _, Ordering::Release);

    let io = IO_CELL.init(Cm3IoHwAb::new());
    let rte_ref = RTE_CELL.init(Rte::new(io, comstack_ref, SIGNAL_IDS));
    RTE_PTR.store(rte_ref as *const _ as *mut _, Ordering::Release);

    // SAFETY: these statics are only ever touched here, once, before the
    // scheduler or any interrupt that could race with it is live.
    let idle_stack = os_port_cm3::stack_from_slice(unsafe { &mut IDLE_STACK });
    let init_stack = os_port_cm3::stack_from_slice(unsafe { &mut INIT_STACK });
    let task_a_stack = os_port_cm3::stack_from_slice(unsafe { &mut TASK_A_STACK });
    let task_b_stack = os_port_cm3::stack_from_slice(unsafe { &mut TASK_B_STACK });

    let tasks = TASKS_CELL.init([
        TaskConfig {
            entry: idle_task_entry,
            stack: idle_stack,
            priority: 0,
            is_extended: false,
            activation_limit: 1,
            autostart: false,
        },
        TaskConfig {
            entry: init_task_entry,
            stack: init_stack,
            priority: 3,
            is_extended: false,
            activation_limit: 1,
            autostart: true,
        },
        TaskConfig {
            entry: task_a_entry,
            stack: task_a_stack,
            priority: 2,
            is_extended: false,
            activation_limit: 1,
            autostart: false,
        },
        TaskConfig {
            entry: task_b_entry,
            stack: task_b_stack,
            priority: 1,
            is_extended: false,
            activation_limit: 1,
            autostart: false,
        },
    ]);

    let kernel_cfg = KERNEL_CFG_CELL.init(KernelConfig {
        tasks,
        counters: &COUNTERS,
        alarms: &ALARMS,
        schedule_tables: &SCHEDULE_TABLES,
        resources: &[],
        ioc_channels: &IOC_CHANNELS,
    });

    let kernel = KERNEL_CELL.init(
        Kernel::<Cm3Arch>::new(kernel_cfg, DefaultHooks).expect("valid kernel configuration"),
    );
    KERNEL_PTR.store(kernel as *const _ as *mut _, Ordering::Release);

    os_port_cm3::install_dispatch_hooks(running_sp_slot_shim, dispatch_sp_slot_shim);

    let mut cp = cortex_m::Peripherals::take().expect("peripherals already taken");
    os_port_cm3::configure_systick(&mut cp.SYST, CORE_CLOCK_HZ, TICK_HZ);

    kernel.start()
}
