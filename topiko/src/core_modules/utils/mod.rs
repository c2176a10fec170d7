pub mod map_raster;
