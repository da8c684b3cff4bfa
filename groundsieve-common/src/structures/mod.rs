mod point3d;

pub use self::point3d::Point3D;
