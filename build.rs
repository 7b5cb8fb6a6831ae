use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

fn method(
    name: &str,
    route: &str,
    input: &str,
    output: &str,
) -> tonic_build::manual::MethodBuilder {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::proto::{input}"))
        .output_type(format!("crate::proto::{output}"))
        .codec_path(CODEC)
}

fn main() {
    let auth_service = Service::builder()
        .name("AuthService")
        .package("pcbook")
        .method(method("login", "Login", "LoginRequest", "LoginResponse").build())
        .build();

    let laptop_service = Service::builder()
        .name("LaptopService")
        .package("pcbook")
        .method(
            method(
                "create_laptop",
                "CreateLaptop",
                "CreateLaptopRequest",
                "CreateLaptopResponse",
            )
            .build(),
        )
        .method(
            method(
                "search_laptop",
                "SearchLaptop",
                "SearchLaptopRequest",
                "SearchLaptopResponse",
            )
            .server_streaming()
            .build(),
        )
        .method(
            method(
                "upload_image",
                "UploadImage",
                "UploadImageRequest",
                "UploadImageResponse",
            )
            .client_streaming()
            .build(),
        )
        .method(
            method(
                "rate_laptop",
                "RateLaptop",
                "RateLaptopRequest",
                "RateLaptopResponse",
            )
            .client_streaming()
            .server_streaming()
            .build(),
        )
        .build();

    Builder::new()
        .build_client(true)
        .build_server(true)
        .compile(&[auth_service, laptop_service]);

    println!("cargo:rerun-if-changed=build.rs");
}
