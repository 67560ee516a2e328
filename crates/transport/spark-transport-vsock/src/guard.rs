use crate::descriptor::StreamDescriptor;

/// 建连阶段描述符的生命周期守卫，负责在 `Drop` 时释放未移交的描述符。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 建连序列在分配描述符之后仍有多个失败点（建连、本地地址查询），每一处都必须释放描述符；
///   将“失败即释放”收敛到一个守卫中，清理规则只表达一次；
/// - 与 `BudgetGuard`、`RatePermit` 相同，采用 `Option` + `Drop` 的归还模式。
///
/// ## 契约（What）
/// - `new`：接管描述符所有权；
/// - `into_inner`：建连成功时解除守卫并交出描述符，此后守卫不再做任何事；
/// - `Drop`：若描述符仍在守卫手中，调用一次 `close`，其错误被丢弃，只记录 `debug` 日志，
///   以免掩盖调用方正在返回的主错误。
pub(crate) struct DescriptorGuard<D: StreamDescriptor> {
    descriptor: Option<D>,
}

impl<D: StreamDescriptor> DescriptorGuard<D> {
    pub(crate) fn new(descriptor: D) -> Self {
        Self {
            descriptor: Some(descriptor),
        }
    }

    /// 借用守卫中的描述符。
    pub(crate) fn get(&self) -> &D {
        match self.descriptor.as_ref() {
            Some(descriptor) => descriptor,
            None => unreachable!("descriptor guard is disarmed only by into_inner"),
        }
    }

    /// 解除守卫并移交描述符所有权。
    pub(crate) fn into_inner(mut self) -> D {
        match self.descriptor.take() {
            Some(descriptor) => descriptor,
            None => unreachable!("descriptor guard is disarmed only by into_inner"),
        }
    }
}

impl<D: StreamDescriptor> Drop for DescriptorGuard<D> {
    fn drop(&mut self) {
        if let Some(mut descriptor) = self.descriptor.take()
            && let Err(error) = descriptor.close()
        {
            tracing::debug!(
                target: "spark::transport::vsock",
                %error,
                "discarding close error during dial cleanup"
            );
        }
    }
}
