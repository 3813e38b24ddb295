pub mod auth;
pub mod errors;

pub mod ciphers {
    pub mod service;
    pub mod http {
        pub mod v1;
    }
}

pub mod devices {
    pub mod service;
    pub mod http {
        pub mod v1;
    }
}

pub mod folders {
    pub mod service;
    pub mod http {
        pub mod v1;
    }
}

pub mod groups {
    pub mod service;
    pub mod http {
        pub mod v1;
    }
}

pub mod sharing {
    pub mod service;
    pub mod http {
        pub mod v1;
    }
}

pub mod sync {
    pub mod fcm;
    pub mod notifier;
    pub mod service;
    pub mod http {
        pub mod v1;
    }
}

pub mod system {
    pub mod http {
        pub mod v1;
    }
}

pub mod users {
    pub mod service;
    pub mod http {
        pub mod v1;
    }
}
