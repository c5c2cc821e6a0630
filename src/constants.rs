// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Label keys used to mark objects managed by the operator
pub mod labels {
    pub const PROJECT: &str = "konnectivity-addon.io/project";
    pub const TENANT: &str = "konnectivity-addon.io/tenant";
    pub const COMPONENT: &str = "konnectivity-addon.io/component";
    /// Discovery label shared by the selector and the pod template
    pub const APP: &str = "k8s-app";
}

/// The operator name used as field manager
pub const OPERATOR_NAME: &str = "konnectivity-addon";

/// TenantControlPlane CRD coordinates and polling configuration
pub mod crd {
    pub const GROUP: &str = "kamaji.clastix.io";
    pub const VERSION: &str = "v1alpha1";
    pub const KIND: &str = "TenantControlPlane";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Tenant kubeconfig secret layout
pub mod kubeconfig {
    pub const ADMIN_KEY: &str = "admin.conf";
    pub const ADMIN_SECRET_SUFFIX: &str = "-admin-kubeconfig";
}

/// Fixed contract of the konnectivity agent DaemonSet
pub mod agent {
    pub const NAME: &str = "konnectivity-agent";
    pub const NAMESPACE: &str = "kube-system";
    pub const COMMAND: &str = "/proxy-agent";

    pub const TOKEN_NAME: &str = "konnectivity-agent-token";
    pub const TOKEN_MOUNT_PATH: &str = "/var/run/secrets/tokens";
    pub const TOKEN_EXPIRATION_SECS: i64 = 3600;
    /// 0644
    pub const TOKEN_FILE_MODE: i32 = 420;

    pub const CA_CERT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
    pub const ADMIN_SERVER_PORT: i32 = 8133;
    pub const HEALTH_SERVER_PORT: i32 = 8134;

    pub const PRIORITY_CLASS: &str = "system-cluster-critical";
    pub const CRITICAL_ADDONS_TOLERATION: &str = "CriticalAddonsOnly";
    pub const OS_NODE_SELECTOR_KEY: &str = "kubernetes.io/os";
    pub const OS_NODE_SELECTOR_VALUE: &str = "linux";

    pub mod probe {
        pub const PATH: &str = "/healthz";
        pub const SCHEME: &str = "HTTP";
        pub const INITIAL_DELAY_SECS: i32 = 15;
        pub const TIMEOUT_SECS: i32 = 15;
        pub const PERIOD_SECS: i32 = 10;
        pub const SUCCESS_THRESHOLD: i32 = 1;
        pub const FAILURE_THRESHOLD: i32 = 3;
    }
}
