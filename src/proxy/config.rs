use serde::{Deserialize, Serialize};

/// 网关服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// 是否允许局域网访问
    /// - false: 仅本机访问 127.0.0.1（默认）
    /// - true: 允许局域网访问 0.0.0.0
    #[serde(default)]
    pub allow_lan_access: bool,

    /// 监听端口 (0 = 随机端口)
    #[serde(default = "default_port")]
    pub port: u16,

    /// 后端 API 基础地址
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// 后端路径前缀，替换入站路径中的 `/api`
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// 后端请求超时时间(秒)，None 表示不设置
    #[serde(default)]
    pub request_timeout: Option<u64>,

    /// 请求体大小上限(字节)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// 登录 Cookie 是否带 Secure 标记 (HTTPS 部署时开启)
    #[serde(default)]
    pub secure_cookies: bool,

    /// 上游代理配置
    #[serde(default)]
    pub upstream_proxy: UpstreamProxyConfig,
}

/// 上游代理配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamProxyConfig {
    /// 是否启用
    pub enabled: bool,
    /// 代理地址 (http://, https://, socks5://)
    pub url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allow_lan_access: false,
            port: default_port(),
            backend_url: default_backend_url(),
            api_prefix: default_api_prefix(),
            request_timeout: None,
            max_body_bytes: default_max_body_bytes(),
            secure_cookies: false,
            upstream_proxy: UpstreamProxyConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    3001
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl ProxyConfig {
    /// 获取实际的监听地址
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// Backend path for an inbound path below `/api`, e.g. `properties/12/`.
    pub fn backend_path(&self, rest: &str) -> String {
        let prefix = self.api_prefix.trim_end_matches('/');
        let rest = rest.trim_start_matches('/');
        format!("{}/{}", prefix, rest)
    }
}
