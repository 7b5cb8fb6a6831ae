//! Wire schema for the `pcbook` gRPC package.
//!
//! Messages are declared with `prost` derives; the client and server stubs
//! for `AuthService` and `LaptopService` are generated by `build.rs`.

/// Fully-qualified gRPC method paths, as they appear in request URIs.
pub mod methods {
    /// `AuthService.Login`.
    pub const LOGIN: &str = "/pcbook.AuthService/Login";
    /// `LaptopService.CreateLaptop`.
    pub const CREATE_LAPTOP: &str = "/pcbook.LaptopService/CreateLaptop";
    /// `LaptopService.SearchLaptop`.
    pub const SEARCH_LAPTOP: &str = "/pcbook.LaptopService/SearchLaptop";
    /// `LaptopService.UploadImage`.
    pub const UPLOAD_IMAGE: &str = "/pcbook.LaptopService/UploadImage";
    /// `LaptopService.RateLaptop`.
    pub const RATE_LAPTOP: &str = "/pcbook.LaptopService/RateLaptop";
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Memory {
    #[prost(uint64, tag = "1")]
    pub value: u64,
    #[prost(enumeration = "memory::Unit", tag = "2")]
    pub unit: i32,
}

pub mod memory {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Unit {
        Unknown = 0,
        Bit = 1,
        Byte = 2,
        Kilobyte = 3,
        Megabyte = 4,
        Gigabyte = 5,
        Terabyte = 6,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Cpu {
    #[prost(string, tag = "1")]
    pub brand: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub number_cores: u32,
    #[prost(uint32, tag = "4")]
    pub number_threads: u32,
    #[prost(double, tag = "5")]
    pub min_ghz: f64,
    #[prost(double, tag = "6")]
    pub max_ghz: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Gpu {
    #[prost(string, tag = "1")]
    pub brand: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(double, tag = "3")]
    pub min_ghz: f64,
    #[prost(double, tag = "4")]
    pub max_ghz: f64,
    #[prost(message, optional, tag = "5")]
    pub memory: ::core::option::Option<Memory>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Storage {
    #[prost(enumeration = "storage::Driver", tag = "1")]
    pub driver: i32,
    #[prost(message, optional, tag = "2")]
    pub memory: ::core::option::Option<Memory>,
}

pub mod storage {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Driver {
        Unknown = 0,
        Hdd = 1,
        Ssd = 2,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Screen {
    #[prost(float, tag = "1")]
    pub size_inch: f32,
    #[prost(message, optional, tag = "2")]
    pub resolution: ::core::option::Option<screen::Resolution>,
    #[prost(enumeration = "screen::Panel", tag = "3")]
    pub panel: i32,
    #[prost(bool, tag = "4")]
    pub multitouch: bool,
}

pub mod screen {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Resolution {
        #[prost(uint32, tag = "1")]
        pub width: u32,
        #[prost(uint32, tag = "2")]
        pub height: u32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Panel {
        Unknown = 0,
        Ips = 1,
        Oled = 2,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Laptop {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub brand: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub cpu: ::core::option::Option<Cpu>,
    #[prost(message, optional, tag = "5")]
    pub ram: ::core::option::Option<Memory>,
    #[prost(message, repeated, tag = "6")]
    pub gpus: ::prost::alloc::vec::Vec<Gpu>,
    #[prost(message, repeated, tag = "7")]
    pub storages: ::prost::alloc::vec::Vec<Storage>,
    #[prost(message, optional, tag = "8")]
    pub screen: ::core::option::Option<Screen>,
    #[prost(double, tag = "11")]
    pub price_usd: f64,
    #[prost(uint32, tag = "12")]
    pub release_year: u32,
    #[prost(oneof = "laptop::Weight", tags = "9, 10")]
    pub weight: ::core::option::Option<laptop::Weight>,
}

pub mod laptop {
    #[derive(Clone, Copy, PartialEq, ::prost::Oneof)]
    pub enum Weight {
        #[prost(double, tag = "9")]
        WeightKg(f64),
        #[prost(double, tag = "10")]
        WeightLb(f64),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Filter {
    #[prost(double, tag = "1")]
    pub max_price_usd: f64,
    #[prost(uint32, tag = "2")]
    pub min_cpu_cores: u32,
    #[prost(double, tag = "3")]
    pub min_cpu_ghz: f64,
    #[prost(message, optional, tag = "4")]
    pub min_ram: ::core::option::Option<Memory>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub username: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub password: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoginResponse {
    #[prost(string, tag = "1")]
    pub access_token: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateLaptopRequest {
    #[prost(message, optional, tag = "1")]
    pub laptop: ::core::option::Option<Laptop>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateLaptopResponse {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SearchLaptopRequest {
    #[prost(message, optional, tag = "1")]
    pub filter: ::core::option::Option<Filter>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SearchLaptopResponse {
    #[prost(message, optional, tag = "1")]
    pub laptop: ::core::option::Option<Laptop>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImageInfo {
    #[prost(string, tag = "1")]
    pub laptop_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub image_type: ::prost::alloc::string::String,
    /// Declared total size in bytes; zero when unknown.
    #[prost(uint64, tag = "3")]
    pub size_hint: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UploadImageRequest {
    #[prost(oneof = "upload_image_request::Data", tags = "1, 2")]
    pub data: ::core::option::Option<upload_image_request::Data>,
}

pub mod upload_image_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "1")]
        Info(super::ImageInfo),
        #[prost(bytes = "vec", tag = "2")]
        ChunkData(::prost::alloc::vec::Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UploadImageResponse {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub size: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RateLaptopRequest {
    #[prost(string, tag = "1")]
    pub laptop_id: ::prost::alloc::string::String,
    #[prost(double, tag = "2")]
    pub score: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RateLaptopResponse {
    #[prost(string, tag = "1")]
    pub laptop_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub rated_count: u32,
    #[prost(double, tag = "3")]
    pub average_score: f64,
}

include!(concat!(env!("OUT_DIR"), "/pcbook.AuthService.rs"));
include!(concat!(env!("OUT_DIR"), "/pcbook.LaptopService.rs"));
