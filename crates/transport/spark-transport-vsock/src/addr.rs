use core::fmt;

/// 保留给 Hypervisor 的上下文 ID。
pub const VMADDR_CID_HYPERVISOR: u32 = 0;
/// 本机回环（`vsock_loopback`）使用的上下文 ID。
pub const VMADDR_CID_LOCAL: u32 = 1;
/// 宿主机的上下文 ID。
pub const VMADDR_CID_HOST: u32 = 2;
/// 通配上下文 ID，仅在绑定阶段有意义。
pub const VMADDR_CID_ANY: u32 = u32::MAX;
/// 通配端口，由内核分配临时端口。
pub const VMADDR_PORT_ANY: u32 = u32::MAX;

/// `VsockAddr` 以 `(context_id, port)` 二元组标识一个 VSOCK 端点。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 为连接两端提供不可变的结构化地址，避免调用方直接接触 `sockaddr_vm`；
/// - 通过稳定的字符串形式（[`VsockAddr::file_name`]）为描述符打标签，便于日志与排障。
///
/// ## 契约（What）
/// - 两个字段均为平台分配的不透明 32 位标识，不做范围校验；
/// - `Display` 输出 `<名称>(<cid>):<port>`，名称取自保留 CID（`hypervisor`/`local`/`host`），
///   其它 CID 统一记为 `vm`；
/// - **后置条件**：值一经构造即不可变，`Copy` 语义保证每条连接持有独立副本。
///
/// ## 注意事项（Trade-offs）
/// - 字符串形式仅用于诊断，不应作为查找键；需要比较时请直接比较结构体。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VsockAddr {
    context_id: u32,
    port: u32,
}

impl VsockAddr {
    /// 以上下文 ID 与端口构造地址。
    pub const fn new(context_id: u32, port: u32) -> Self {
        Self { context_id, port }
    }

    /// 读取上下文 ID。
    pub const fn context_id(&self) -> u32 {
        self.context_id
    }

    /// 读取端口。
    pub const fn port(&self) -> u32 {
        self.port
    }

    /// 地址所属的网络名称，恒为 `"vsock"`。
    pub const fn network(&self) -> &'static str {
        "vsock"
    }

    /// 生成描述符标签，例如 `vsock:host(2):1024`。
    pub fn file_name(&self) -> String {
        format!("{}:{}", self.network(), self)
    }
}

fn context_name(context_id: u32) -> &'static str {
    match context_id {
        VMADDR_CID_HYPERVISOR => "hypervisor",
        VMADDR_CID_LOCAL => "local",
        VMADDR_CID_HOST => "host",
        VMADDR_CID_ANY => "any",
        _ => "vm",
    }
}

impl fmt::Display for VsockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}):{}",
            context_name(self.context_id),
            self.context_id,
            self.port
        )
    }
}

impl From<(u32, u32)> for VsockAddr {
    fn from((context_id, port): (u32, u32)) -> Self {
        Self::new(context_id, port)
    }
}
