use crate::{
    addr::VsockAddr,
    connection::VsockConnection,
    descriptor::{DescriptorProvider, StreamDescriptor},
    error::VsockError,
    guard::DescriptorGuard,
    socket::{SystemSockets, VsockSocket, VsockSocketConfig},
};

/// 以默认配置拨号到 `(context_id, port)`。
///
/// 这是建立出站 VSOCK 连接的唯一入口，等价于
/// `VsockDialer::system(VsockSocketConfig::default()).dial(context_id, port)`。
pub fn dial_stream(context_id: u32, port: u32) -> Result<VsockConnection<VsockSocket>, VsockError> {
    dial_stream_with_config(context_id, port, VsockSocketConfig::default())
}

/// 以指定套接字配置拨号。
pub fn dial_stream_with_config(
    context_id: u32,
    port: u32,
    config: VsockSocketConfig,
) -> Result<VsockConnection<VsockSocket>, VsockError> {
    VsockDialer::system(config).dial(context_id, port)
}

/// VSOCK 拨号器：编排“分配 → 建连 → 查询本地地址 → 封装”四步。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 建连序列在分配描述符后仍有两个失败点，任何一处失败都不得泄漏描述符；
/// - 把“正常构造”与“失败清理”拆开：`dial` 只负责分配并把描述符交给
///   [`DescriptorGuard`]，`establish` 只描述成功路径，清理规则由守卫统一执行。
///
/// ## 契约（What）
/// - 分配失败：原样返回 [`VsockError::Socket`]，无需也不会尝试关闭；
/// - 建连或本地地址查询失败：返回前描述符已被关闭且仅关闭一次，关闭自身的错误被丢弃；
/// - 成功：返回的 [`VsockConnection`] 独占描述符，`peer_addr` 等于入参、`local_addr`
///   等于内核报告的绑定地址；
/// - 本层从不重试，重试与退避由调用方决定。
///
/// ## 设计取舍（Trade-offs）
/// - 通过 [`DescriptorProvider`] 泛型注入描述符来源，测试可以替换为模拟实现而不依赖内核；
/// - 拨号是同步阻塞调用，握手时长只能通过 [`VsockSocketConfig::with_connect_timeout`] 约束。
#[derive(Clone, Debug, Default)]
pub struct VsockDialer<P = SystemSockets> {
    provider: P,
}

impl VsockDialer<SystemSockets> {
    /// 使用真实内核套接字的拨号器。
    pub fn system(config: VsockSocketConfig) -> Self {
        Self::new(SystemSockets::new(config))
    }
}

impl<P: DescriptorProvider> VsockDialer<P> {
    /// 以自定义描述符来源构造拨号器。
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// 读取描述符来源。
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// 拨号到 `(context_id, port)`。
    pub fn dial(
        &self,
        context_id: u32,
        port: u32,
    ) -> Result<VsockConnection<P::Descriptor>, VsockError> {
        let remote = VsockAddr::new(context_id, port);
        let descriptor = self.provider.open()?;
        let connection = establish(DescriptorGuard::new(descriptor), remote)?;
        tracing::debug!(
            target: "spark::transport::vsock",
            local = %connection.local_addr(),
            remote = %connection.peer_addr(),
            file = %connection.file_name(),
            "vsock stream connected"
        );
        Ok(connection)
    }

    /// 拨号到给定地址。
    pub fn dial_addr(
        &self,
        remote: VsockAddr,
    ) -> Result<VsockConnection<P::Descriptor>, VsockError> {
        self.dial(remote.context_id(), remote.port())
    }
}

/// 成功路径：建连、查询本地地址、移交所有权。任一步 `?` 提前返回时，守卫负责关闭描述符。
fn establish<D: StreamDescriptor>(
    guard: DescriptorGuard<D>,
    remote: VsockAddr,
) -> Result<VsockConnection<D>, VsockError> {
    guard.get().connect(remote)?;
    let local = guard.get().local_addr()?;
    Ok(VsockConnection::new(guard.into_inner(), local, remote))
}
