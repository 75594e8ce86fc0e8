tonic::include_proto!("shorty");
