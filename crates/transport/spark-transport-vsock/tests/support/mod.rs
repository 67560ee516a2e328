//! 模拟描述符：在不依赖内核 VSOCK 支持的前提下注入失败并统计调用次数。
//!
//! - `Plan` 描述一次拨号的剧本（哪一步失败、内核报告的本地地址、每次读写最多推进多少字节）；
//! - `Probe` 在提供者与描述符之间共享，记录分配/关闭/系统调用次数以及写出的字节，
//!   测试据此断言“恰好关闭一次”“关闭后不再触达内核”等性质。
#![allow(dead_code)]

use spark_transport_vsock::{
    Deadline, DescriptorProvider, OperationKind, ShutdownDirection, StreamDescriptor, VsockAddr,
    VsockDialer, VsockError,
    error::{CLOSE, CONNECT, LOCAL_ADDR, READ, SET_DEADLINE, SHUTDOWN, WRITE},
};
use std::{
    collections::VecDeque,
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

#[derive(Clone, Debug)]
pub struct Plan {
    pub open_error: Option<io::ErrorKind>,
    pub connect_error: Option<io::ErrorKind>,
    pub local_addr_error: Option<io::ErrorKind>,
    pub close_error: Option<io::ErrorKind>,
    pub local: VsockAddr,
    pub inbound: Vec<u8>,
    pub read_chunk: Option<usize>,
    pub write_chunk: Option<usize>,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            open_error: None,
            connect_error: None,
            local_addr_error: None,
            close_error: None,
            local: VsockAddr::new(3, 49_152),
            inbound: Vec::new(),
            read_chunk: None,
            write_chunk: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Probe {
    opens: AtomicUsize,
    closes: AtomicUsize,
    os_calls: AtomicUsize,
    connected_to: Mutex<Option<VsockAddr>>,
    outbound: Mutex<Vec<u8>>,
    shutdowns: Mutex<Vec<ShutdownDirection>>,
}

impl Probe {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn os_calls(&self) -> usize {
        self.os_calls.load(Ordering::SeqCst)
    }

    pub fn connected_to(&self) -> Option<VsockAddr> {
        *self.connected_to.lock().expect("probe lock")
    }

    pub fn outbound(&self) -> Vec<u8> {
        self.outbound.lock().expect("probe lock").clone()
    }

    pub fn shutdowns(&self) -> Vec<ShutdownDirection> {
        self.shutdowns.lock().expect("probe lock").clone()
    }

    fn touch(&self) {
        self.os_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct SimulatedProvider {
    plan: Plan,
    probe: Arc<Probe>,
}

impl SimulatedProvider {
    pub fn new(plan: Plan) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        (
            Self {
                plan,
                probe: Arc::clone(&probe),
            },
            probe,
        )
    }
}

impl DescriptorProvider for SimulatedProvider {
    type Descriptor = SimulatedDescriptor;

    fn open(&self) -> Result<SimulatedDescriptor, VsockError> {
        if let Some(kind) = self.plan.open_error {
            return Err(VsockError::Socket {
                source: io::Error::from(kind),
            });
        }
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        Ok(SimulatedDescriptor {
            plan: self.plan.clone(),
            probe: Arc::clone(&self.probe),
            inbound: Mutex::new(self.plan.inbound.iter().copied().collect()),
            read_deadline: Mutex::new(Deadline::none()),
            write_deadline: Mutex::new(Deadline::none()),
            closed: false,
        })
    }
}

#[derive(Debug)]
pub struct SimulatedDescriptor {
    plan: Plan,
    probe: Arc<Probe>,
    inbound: Mutex<VecDeque<u8>>,
    read_deadline: Mutex<Deadline>,
    write_deadline: Mutex<Deadline>,
    closed: bool,
}

impl SimulatedDescriptor {
    fn ensure_open(&self, op: OperationKind) -> Result<(), VsockError> {
        if self.closed {
            return Err(VsockError::closed(op));
        }
        self.probe.touch();
        Ok(())
    }
}

impl StreamDescriptor for SimulatedDescriptor {
    fn connect(&self, remote: VsockAddr) -> Result<(), VsockError> {
        self.ensure_open(CONNECT)?;
        *self.probe.connected_to.lock().expect("probe lock") = Some(remote);
        match self.plan.connect_error {
            Some(kind) => Err(VsockError::Connect {
                remote,
                source: io::Error::from(kind),
            }),
            None => Ok(()),
        }
    }

    fn local_addr(&self) -> Result<VsockAddr, VsockError> {
        self.ensure_open(LOCAL_ADDR)?;
        match self.plan.local_addr_error {
            Some(kind) => Err(VsockError::LocalAddr {
                source: io::Error::from(kind),
            }),
            None => Ok(self.plan.local),
        }
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, VsockError> {
        self.ensure_open(READ)?;
        if self
            .read_deadline
            .lock()
            .expect("deadline lock")
            .is_expired(Instant::now())
        {
            return Err(VsockError::timeout(READ));
        }
        let mut inbound = self.inbound.lock().expect("inbound lock");
        let limit = self.plan.read_chunk.unwrap_or(usize::MAX);
        let n = buf.len().min(limit).min(inbound.len());
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, VsockError> {
        self.ensure_open(WRITE)?;
        if self
            .write_deadline
            .lock()
            .expect("deadline lock")
            .is_expired(Instant::now())
        {
            return Err(VsockError::timeout(WRITE));
        }
        let limit = self.plan.write_chunk.unwrap_or(usize::MAX);
        let n = buf.len().min(limit);
        self.probe
            .outbound
            .lock()
            .expect("probe lock")
            .extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn set_read_deadline(&self, deadline: Deadline) -> Result<(), VsockError> {
        self.ensure_open(SET_DEADLINE)?;
        *self.read_deadline.lock().expect("deadline lock") = deadline;
        Ok(())
    }

    fn set_write_deadline(&self, deadline: Deadline) -> Result<(), VsockError> {
        self.ensure_open(SET_DEADLINE)?;
        *self.write_deadline.lock().expect("deadline lock") = deadline;
        Ok(())
    }

    fn shutdown(&self, direction: ShutdownDirection) -> Result<(), VsockError> {
        self.ensure_open(SHUTDOWN)?;
        self.probe
            .shutdowns
            .lock()
            .expect("probe lock")
            .push(direction);
        Ok(())
    }

    fn close(&mut self) -> Result<(), VsockError> {
        if self.closed {
            return Err(VsockError::closed(CLOSE));
        }
        self.closed = true;
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        match self.plan.close_error {
            Some(kind) => Err(VsockError::io(CLOSE, io::Error::from(kind))),
            None => Ok(()),
        }
    }
}

/// 按剧本构造拨号器。
pub fn simulated_dialer(plan: Plan) -> (VsockDialer<SimulatedProvider>, Arc<Probe>) {
    let (provider, probe) = SimulatedProvider::new(plan);
    (VsockDialer::new(provider), probe)
}
