//! 运行环境相关的小工具：panic 钩子与控制台日志。

/// 在浏览器中把 panic 信息输出到控制台。
#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}

/// 写一行日志到浏览器控制台；原生目标上不输出。
#[cfg(target_arch = "wasm32")]
pub fn console_log(message: &str) {
    web_sys::console::log_1(&message.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn console_log(_message: &str) {}
