use crate::{
    addr::VsockAddr,
    deadline::Deadline,
    descriptor::{ShutdownDirection, StreamDescriptor},
    error::VsockError,
    socket::VsockSocket,
};
use std::io;

/// 已建立的 VSOCK 字节流连接。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 为上层提供单条 VSOCK 连接的直接控制：读写、截止时间、半关闭与关闭；
/// - 自身不引入缓冲、分帧或重试，所有行为都委托给独占持有的描述符。
///
/// ## 逻辑 (How)
/// - 结构体只包含描述符与两个不可变地址，地址在建连时一次性确定；
/// - `read`/`write`/截止时间以 `&self` 暴露，`close` 需要 `&mut self`；
/// - 同时实现 `std::io::Read`/`Write`（包括 `&VsockConnection`），错误按 `ErrorKind` 转换。
///
/// ## 契约 (What)
/// - `local_addr`/`peer_addr`：纯访问器，返回建连时记录的地址；
/// - `read`/`write`：单次调用，部分结果原样返回，调用方自行循环；
/// - `close`：唯一的状态迁移（open → closed），之后所有操作返回 [`VsockError::Closed`]，
///   该检查由描述符负责，本结构不再重复判断。
///
/// ## 注意事项 (Trade-offs)
/// - 截止时间是绝对时间点，只影响之后发起的阻塞操作，不会中断正在进行的调用；
/// - 直接丢弃连接同样会释放描述符，但无法观察关闭结果，需要确认时请显式调用 `close`。
#[derive(Debug)]
pub struct VsockConnection<D: StreamDescriptor = VsockSocket> {
    descriptor: D,
    local_addr: VsockAddr,
    peer_addr: VsockAddr,
}

impl<D: StreamDescriptor> VsockConnection<D> {
    pub(crate) fn new(descriptor: D, local_addr: VsockAddr, peer_addr: VsockAddr) -> Self {
        Self {
            descriptor,
            local_addr,
            peer_addr,
        }
    }

    /// 本端地址（内核在建连时分配）。
    pub fn local_addr(&self) -> VsockAddr {
        self.local_addr
    }

    /// 对端地址（拨号时指定）。
    pub fn peer_addr(&self) -> VsockAddr {
        self.peer_addr
    }

    /// 本端描述符标签，形如 `vsock:vm(3):49152`。
    pub fn file_name(&self) -> String {
        self.local_addr.file_name()
    }

    /// 读取数据到缓冲区，`Ok(0)` 表示对端已关闭写方向。
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, VsockError> {
        self.descriptor.read(buf)
    }

    /// 写入数据，返回实际写入的字节数。
    pub fn write(&self, buf: &[u8]) -> Result<usize, VsockError> {
        self.descriptor.write(buf)
    }

    /// 同时设置读写截止时间；[`Deadline::none`] 关闭超时。
    pub fn set_deadline(&self, deadline: impl Into<Deadline>) -> Result<(), VsockError> {
        self.descriptor.set_deadline(deadline.into())
    }

    /// 设置读截止时间。
    pub fn set_read_deadline(&self, deadline: impl Into<Deadline>) -> Result<(), VsockError> {
        self.descriptor.set_read_deadline(deadline.into())
    }

    /// 设置写截止时间。
    pub fn set_write_deadline(&self, deadline: impl Into<Deadline>) -> Result<(), VsockError> {
        self.descriptor.set_write_deadline(deadline.into())
    }

    /// 按方向执行半关闭。
    pub fn shutdown(&self, direction: ShutdownDirection) -> Result<(), VsockError> {
        self.descriptor.shutdown(direction)
    }

    /// 关闭连接。
    pub fn close(&mut self) -> Result<(), VsockError> {
        self.descriptor.close()
    }

    /// 借用底层描述符。
    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// 拆出底层描述符，地址信息随之丢弃。
    pub fn into_descriptor(self) -> D {
        self.descriptor
    }
}

impl<D: StreamDescriptor> io::Read for &VsockConnection<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        VsockConnection::read(*self, buf).map_err(io::Error::from)
    }
}

impl<D: StreamDescriptor> io::Write for &VsockConnection<D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        VsockConnection::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<D: StreamDescriptor> io::Read for VsockConnection<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }
}

impl<D: StreamDescriptor> io::Write for VsockConnection<D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
